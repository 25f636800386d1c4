pub mod error_type;
pub mod raw_step;
pub mod snapshot;
pub mod step;

pub use error_type::ErrorType;
pub use raw_step::RawStep;
pub use snapshot::Snapshot;
pub use step::{KeyView, Step, StepExpectation, StepId, StepProgress};
