use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::bridge::RawEvent;
use crate::models::Snapshot;

/// One line of a recorded trace.
///
/// ```text
/// {"kind": "screen", "packageName": "com.a", "visibleViews": ["go"]}
/// {"kind": "event", "event": "click", "viewId": "go"}
/// {"kind": "wait", "ms": 200}
/// {"kind": "expect", "step": 2, "completed": false}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    /// Replaces what the observation source reports from now on.
    Screen(Snapshot),
    Event(RawEvent),
    Wait {
        ms: u64,
    },
    Next,
    Prev,
    /// Checks the monitor once every earlier entry has been handled.
    Expect {
        /// 1-based step number.
        #[serde(default)]
        step: Option<usize>,
        #[serde(default)]
        completed: Option<bool>,
    },
}

/// Parses JSON lines. Blank lines and lines starting with `#` are skipped.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid trace entry on line {}", number + 1))
        })
        .collect()
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&text)
}
