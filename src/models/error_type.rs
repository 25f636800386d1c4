use serde::{Deserialize, Serialize};

/// Outcome of error classification for a step that did not match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    WrongApp,
    FrozenScreen,
    WrongClick,
    #[default]
    None,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::WrongApp => "WRONG_APP",
            ErrorType::FrozenScreen => "FROZEN_SCREEN",
            ErrorType::WrongClick => "WRONG_CLICK",
            ErrorType::None => "NONE",
        }
    }

    /// Wrong-app and frozen-screen need several consecutive sightings before they count.
    pub fn is_confidence_gated(&self) -> bool {
        matches!(self, ErrorType::WrongApp | ErrorType::FrozenScreen)
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
