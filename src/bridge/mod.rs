//! Narrow capability interfaces to the host platform: where snapshots come from and where
//! progress is shown. The engine only ever talks to these traits.

pub mod log_presentation;

use serde::{Deserialize, Serialize};

use crate::models::{ErrorType, Snapshot};

pub use log_presentation::LogPresentation;

/// Raw UI-change notification from the observation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RawEvent {
    Click {
        #[serde(default, rename = "viewId")]
        view_id: Option<String>,
    },
    WindowChanged,
    TextChanged,
    ContentChanged,
}

pub trait ObservationSource: Send + Sync {
    /// Captures the screen as it is right now.
    fn current_snapshot(&self) -> Snapshot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Waiting,
    Checking,
    Matched,
    Completed,
}

/// Overlay or any other progress display. Calls are dispatched and not awaited.
pub trait PresentationSink: Send + Sync {
    /// `index` is 1-based.
    fn set_current_step(&self, index: usize, total: usize, instruction: &str);
    fn set_status(&self, status: StepStatus);
    fn show_error(&self, error: ErrorType, auto_hide_ms: u64);
    fn show(&self);
    fn hide(&self);
}
