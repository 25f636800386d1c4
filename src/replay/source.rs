use std::sync::Mutex;

use chrono::Utc;

use crate::bridge::ObservationSource;
use crate::models::Snapshot;

/// Observation source backed by the last `screen` entry of a trace.
#[derive(Debug)]
pub struct ReplaySource {
    screen: Mutex<Snapshot>,
}

impl Default for ReplaySource {
    fn default() -> Self {
        Self {
            screen: Mutex::new(Snapshot::blank()),
        }
    }
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, snapshot: Snapshot) {
        let mut guard = self.screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = snapshot;
    }
}

impl ObservationSource for ReplaySource {
    fn current_snapshot(&self) -> Snapshot {
        let guard = self.screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Snapshot {
            timestamp: Utc::now(),
            ..guard.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_latest_screen() {
        let source = ReplaySource::new();
        assert_eq!(source.current_snapshot().package_name, "");

        source.show(Snapshot::new("com.a", None, ["go"], Vec::<String>::new()));
        let first = source.current_snapshot();
        assert_eq!(first.package_name, "com.a");
        assert!(first.same_screen_as(&source.current_snapshot()));
    }
}
