use serde::{Deserialize, Serialize};

use super::ErrorType;

pub type StepId = i64;

/// A recorded UI element whose presence is evidence that a step's screen is showing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyView {
    #[serde(default)]
    pub view_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl KeyView {
    pub fn with_id(view_id: impl Into<String>) -> Self {
        Self {
            view_id: Some(view_id.into()),
            text: None,
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            view_id: None,
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepExpectation {
    pub expected_package: String,
    /// Informational only; never consulted when matching.
    #[serde(default)]
    pub expected_activity: Option<String>,
    #[serde(default)]
    pub expected_key_views: Vec<KeyView>,
}

/// One step of a curriculum. Immutable once loaded; runtime status lives in [`StepProgress`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: StepId,
    pub step_name: String,
    pub expectation: StepExpectation,
}

impl Step {
    pub fn new(step_id: StepId, step_name: impl Into<String>, expectation: StepExpectation) -> Self {
        Self {
            step_id,
            step_name: step_name.into(),
            expectation,
        }
    }

    pub fn expected_package(&self) -> &str {
        &self.expectation.expected_package
    }

    pub fn key_views(&self) -> &[KeyView] {
        &self.expectation.expected_key_views
    }
}

/// Mutable per-step status, reset whenever the step becomes active again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub is_completed: bool,
    pub error_type: ErrorType,
}

impl StepProgress {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
