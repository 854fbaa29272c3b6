pub mod event;
pub mod retry;
pub mod submission_status;

pub use event::{Event, EventEnvelope, Room};
pub use retry::{RetryDecision, RetryPolicy};
pub use submission_status::SubmissionStatus;
