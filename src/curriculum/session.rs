use serde::Serialize;

/// Display metadata for a recorded session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub name: String,
    pub display_name: String,
    pub step_count: usize,
    pub timestamp: String,
}

impl SessionInfo {
    pub fn new(name: &str, step_count: usize) -> Self {
        let timestamp = name.replace("session_", "");
        Self {
            name: name.to_string(),
            display_name: format_session_timestamp(&timestamp),
            step_count,
            timestamp,
        }
    }
}

/// `20251119_105345` becomes `2025-11-19 10:53:45`; anything shorter is returned as is.
pub fn format_session_timestamp(timestamp: &str) -> String {
    split_timestamp(timestamp).unwrap_or_else(|| timestamp.to_string())
}

fn split_timestamp(ts: &str) -> Option<String> {
    Some(format!(
        "{}-{}-{} {}:{}:{}",
        ts.get(0..4)?,
        ts.get(4..6)?,
        ts.get(6..8)?,
        ts.get(9..11)?,
        ts.get(11..13)?,
        ts.get(13..15)?,
    ))
}
