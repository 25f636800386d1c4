pub mod matcher;

pub use matcher::{StepMatcher, DEFAULT_FROZEN_AFTER};
