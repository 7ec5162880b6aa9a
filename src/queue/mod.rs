pub mod broker;
pub mod store;

pub use broker::{SubmitError, TaskBroker};
pub use store::SubmissionQueue;
