use log::info;

use super::{PresentationSink, StepStatus};
use crate::models::ErrorType;

/// Presentation that narrates overlay updates to the log. Used by the replay CLI.
#[derive(Debug, Default, Clone)]
pub struct LogPresentation;

fn error_banner(error: ErrorType) -> (&'static str, &'static str) {
    match error {
        ErrorType::WrongApp => (
            "A different app is open",
            "Go back to the expected app screen",
        ),
        ErrorType::FrozenScreen => (
            "The screen seems stuck",
            "No change was detected after your tap. Try again",
        ),
        ErrorType::WrongClick => ("You tapped a different button", "Tap the highlighted button"),
        ErrorType::None => ("Something went wrong", "An unknown error occurred"),
    }
}

impl PresentationSink for LogPresentation {
    fn set_current_step(&self, index: usize, total: usize, instruction: &str) {
        info!("[overlay] step {index}/{total}: {instruction}");
    }

    fn set_status(&self, status: StepStatus) {
        info!("[overlay] status {status:?}");
    }

    fn show_error(&self, error: ErrorType, auto_hide_ms: u64) {
        let (title, message) = error_banner(error);
        info!("[overlay] {title}: {message} (hides after {auto_hide_ms}ms)");
    }

    fn show(&self) {
        info!("[overlay] shown");
    }

    fn hide(&self) {
        info!("[overlay] hidden");
    }
}
