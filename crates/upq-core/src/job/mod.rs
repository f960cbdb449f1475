//! Job records: identity, payload reference, lifecycle state, and the
//! snapshots handed to observers and callers.
//!
//! Records are owned and mutated only by the queue manager; everything
//! outside the manager sees [`JobSnapshot`] copies.

mod payload;
mod record;
mod state;

pub use payload::Payload;
pub(crate) use record::JobRecord;
pub use record::JobSnapshot;
pub use state::{JobId, JobState, StatusTone};
