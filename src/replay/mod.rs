//! Drives a running monitor from a recorded trace, so walkthroughs can be checked without a
//! device attached.

pub mod source;
pub mod trace;

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::monitoring::{MonitorHandle, MonitorStatus};

pub use source::ReplaySource;
pub use trace::{load_trace, parse_trace, TraceEntry};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// A failed `expect` entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Mismatch {
    pub entry: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub entries: usize,
    pub mismatches: Vec<Mismatch>,
    pub final_status: MonitorStatus,
}

impl ReplayReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Feeds every entry to the monitor in order. `wait` entries sleep on the tokio clock so pending
/// debounces get a chance to fire.
pub async fn replay(
    handle: &MonitorHandle,
    source: &ReplaySource,
    entries: &[TraceEntry],
) -> Result<ReplayReport> {
    let mut mismatches = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        log_debug!("[replay] #{} {:?}", position + 1, entry);
        match entry {
            TraceEntry::Screen(snapshot) => source.show(snapshot.clone()),
            TraceEntry::Event(event) => handle.notify(event.clone()),
            TraceEntry::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            TraceEntry::Next => handle.next_step(),
            TraceEntry::Prev => handle.previous_step(),
            TraceEntry::Expect { step, completed } => {
                let status = handle.status().await?;
                for message in check_expectation(&status, *step, *completed) {
                    log_warn!("[replay] entry {}: {}", position + 1, message);
                    mismatches.push(Mismatch {
                        entry: position + 1,
                        message,
                    });
                }
            }
        }
    }

    Ok(ReplayReport {
        entries: entries.len(),
        mismatches,
        final_status: handle.status().await?,
    })
}

fn check_expectation(
    status: &MonitorStatus,
    step: Option<usize>,
    completed: Option<bool>,
) -> Vec<String> {
    let mut failures = Vec::new();
    let actual_step = status.step_index + 1;

    if let Some(expected) = step {
        if status.total_steps == 0 || expected != actual_step {
            failures.push(format!(
                "expected step {expected}, monitor is on step {actual_step} of {}",
                status.total_steps
            ));
        }
    }
    if let Some(expected) = completed {
        if expected != status.completed {
            failures.push(format!(
                "expected step {actual_step} completed={expected}, was {}",
                status.completed
            ));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::monitoring::engine::tests::{two_step_curriculum, RecordingOverlay, RecordingTelemetry};
    use crate::monitoring::{Collaborators, MonitoringController};

    fn controller(source: Arc<ReplaySource>) -> (MonitoringController, Arc<RecordingTelemetry>) {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let collaborators = Collaborators {
            observer: source,
            presentation: Arc::new(RecordingOverlay::default()),
            telemetry: telemetry.clone(),
        };
        (MonitoringController::new(collaborators), telemetry)
    }

    #[tokio::test(start_paused = true)]
    async fn walkthrough_trace_completes_both_steps() {
        let source = Arc::new(ReplaySource::new());
        let (mut controller, telemetry) = controller(source.clone());
        let handle = controller.start(EngineConfig::default()).unwrap();
        handle.load_session(two_step_curriculum());

        let trace = parse_trace(
            r#"
{"kind": "screen", "packageName": "com.a", "visibleViews": ["go"]}
{"kind": "event", "event": "content_changed"}
{"kind": "expect", "step": 1, "completed": false}
{"kind": "wait", "ms": 200}
{"kind": "expect", "step": 1, "completed": true}
{"kind": "next"}
{"kind": "screen", "packageName": "com.b", "textNodes": ["All Done"]}
{"kind": "event", "event": "window_changed"}
{"kind": "expect", "step": 2, "completed": true}
"#,
        )
        .unwrap();

        let report = replay(&handle, &source, &trace).await.unwrap();
        assert!(report.passed(), "{:?}", report.mismatches);
        assert_eq!(report.entries, 9);
        assert_eq!(report.final_status.completed_flags, vec![true, true]);
        assert_eq!(telemetry.count("step_matched"), 2);

        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_expectations_are_collected() {
        let source = Arc::new(ReplaySource::new());
        let (mut controller, _) = controller(source.clone());
        let handle = controller.start(EngineConfig::default()).unwrap();
        handle.load_session(two_step_curriculum());

        let trace = parse_trace(
            r#"{"kind": "screen", "packageName": "com.other"}
{"kind": "event", "event": "text_changed"}
{"kind": "expect", "step": 2, "completed": true}"#,
        )
        .unwrap();

        let report = replay(&handle, &source, &trace).await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.mismatches.len(), 2);
        assert!(report.mismatches.iter().all(|m| m.entry == 3));

        controller.stop().await.unwrap();
    }
}
