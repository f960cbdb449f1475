pub mod config;
pub mod logging;

pub mod checksum;
pub mod executor;
pub mod job;
pub mod observer;
pub mod queue;
pub mod status;
pub mod transfer;

pub use executor::{ProgressReporter, TransferError, TransferExecutor, TransferFuture, TransferReceipt};
pub use job::{JobId, JobSnapshot, JobState, Payload};
pub use observer::{EventKind, QueueEvent, QueueObserver};
pub use queue::{QueueError, QueueManager};
pub use status::QueueStatus;
