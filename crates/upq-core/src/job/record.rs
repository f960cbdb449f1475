//! The mutable job record kept by the queue and its immutable snapshot.

use serde::Serialize;

use super::payload::Payload;
use super::state::{JobId, JobState};
use crate::executor::TransferReceipt;

/// Read-only copy of a job record, safe to hand to observers and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub payload: Payload,
    pub state: JobState,
    /// Percentage 0..=100; 100 only when Completed.
    pub progress: u8,
    /// Retry attempts already consumed.
    pub retry_count: u32,
    /// Last failure message, if an attempt has failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Success artifact, set only when Completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TransferReceipt>,
}

/// Job record owned by the queue manager.
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub(crate) id: JobId,
    pub(crate) payload: Payload,
    pub(crate) state: JobState,
    pub(crate) progress: u8,
    pub(crate) retry_count: u32,
    pub(crate) error: Option<String>,
    pub(crate) result: Option<TransferReceipt>,
    /// Generation of the current (or last) dispatch. Callbacks and timers
    /// carrying another generation are stale and ignored.
    pub(crate) attempt: u64,
}

impl JobRecord {
    pub(crate) fn new(id: JobId, payload: Payload) -> Self {
        Self {
            id,
            payload,
            state: JobState::Pending,
            progress: 0,
            retry_count: 0,
            error: None,
            result: None,
            attempt: 0,
        }
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            payload: self.payload.clone(),
            state: self.state,
            progress: self.progress,
            retry_count: self.retry_count,
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }

    /// True while this record is in flight for the given dispatch generation.
    pub(crate) fn is_uploading(&self, attempt: u64) -> bool {
        self.state == JobState::Uploading && self.attempt == attempt
    }

    /// Manual reset of a Failed job back to Pending.
    pub(crate) fn reset_for_retry(&mut self) {
        self.state = JobState::Pending;
        self.progress = 0;
        self.retry_count = 0;
        self.error = None;
    }
}
