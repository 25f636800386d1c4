pub mod client;
pub mod session;

pub use client::{parse_sessions, parse_steps, select_steps, CurriculumClient};
pub use session::{format_session_timestamp, SessionInfo};
