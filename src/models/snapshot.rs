use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time capture of what is on screen. Built fresh for every observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub package_name: String,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(default)]
    pub visible_views: BTreeSet<String>,
    #[serde(default)]
    pub text_nodes: BTreeSet<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn new<V, T>(
        package_name: impl Into<String>,
        activity_name: Option<String>,
        visible_views: V,
        text_nodes: T,
    ) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            package_name: package_name.into(),
            activity_name,
            visible_views: visible_views.into_iter().map(Into::into).collect(),
            text_nodes: text_nodes.into_iter().map(Into::into).collect(),
            timestamp: Utc::now(),
        }
    }

    /// An empty screen, used when the observation source has nothing to report.
    pub fn blank() -> Self {
        Self::new("", None, Vec::<String>::new(), Vec::<String>::new())
    }

    /// Same package, activity and visible views. Text and timestamp are ignored.
    pub fn same_screen_as(&self, other: &Snapshot) -> bool {
        self.package_name == other.package_name
            && self.activity_name == other.activity_name
            && self.visible_views == other.visible_views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_screen_ignores_text_and_time() {
        let a = Snapshot::new("com.a", Some("Main".into()), ["x", "y"], ["hello"]);
        let mut b = Snapshot::new("com.a", Some("Main".into()), ["y", "x"], ["bye"]);
        b.timestamp = a.timestamp + chrono::Duration::seconds(10);
        assert!(a.same_screen_as(&b));

        let c = Snapshot::new("com.a", Some("Other".into()), ["x", "y"], ["hello"]);
        assert!(!a.same_screen_as(&c));
    }
}
