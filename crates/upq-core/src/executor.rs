//! Transfer executor interface.
//!
//! The queue manager only depends on this trait and does not know how bytes
//! are moved (HTTP, object storage, local directory). An executor performs
//! one transfer per call, reports progress through a [`ProgressReporter`],
//! and resolves exactly once with the outcome. Retrying is queue policy,
//! never the executor's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::job::Payload;

/// Success artifact of a transfer (where the data ended up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Location reference of the stored object (URL or path).
    pub location: String,
    /// Bytes transferred.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the content, if the executor computed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl TransferReceipt {
    pub fn new(location: impl Into<String>, bytes: u64) -> Self {
        Self {
            location: location.into(),
            bytes,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// Failure reported by an executor. Its message becomes the job's `error`.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The remote side or the executor refused the transfer.
    #[error("{0}")]
    Rejected(String),
    /// Payload exceeds the executor's size limit. Retrying will not help,
    /// but the queue applies its retry policy uniformly.
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    /// Reading the source or writing the destination failed.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl TransferError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        TransferError::Rejected(msg.into())
    }
}

/// Future returned by [`TransferExecutor::execute`].
pub type TransferFuture =
    Pin<Box<dyn Future<Output = Result<TransferReceipt, TransferError>> + Send + 'static>>;

/// Performs a single transfer.
///
/// Contract: call `progress.report` zero or more times with non-decreasing
/// values in `0..=100`, then resolve the future exactly once. A future that
/// never resolves keeps its concurrency slot occupied forever; bounding the
/// transfer time is the executor's responsibility.
pub trait TransferExecutor: Send + Sync + 'static {
    fn execute(&self, payload: Payload, progress: ProgressReporter) -> TransferFuture;
}

/// Handle given to an executor for reporting percentage progress of one
/// dispatch. Cheap to clone; reports for a dispatch the queue no longer
/// tracks (removed job, stale attempt) are dropped silently.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Reporter that discards everything (for driving an executor directly).
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report completion percentage; values above 100 are clamped.
    pub fn report(&self, percent: u8) {
        (self.sink)(percent.min(100));
    }

    /// Report progress as a byte count out of a total.
    pub fn report_bytes(&self, done: u64, total: u64) {
        self.report(percent_of(done, total));
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

/// Rounded percentage of `done / total`; an empty total counts as done.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done.min(total) as u128 * 100 + total as u128 / 2) / total as u128;
    pct as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn percent_of_rounds_and_caps() {
        assert_eq!(percent_of(0, 200), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(500, 200), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn reporter_forwards_clamped_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(move |p| sink.lock().unwrap().push(p));
        reporter.report(10);
        reporter.report(250);
        reporter.report_bytes(50, 100);
        assert_eq!(*seen.lock().unwrap(), vec![10, 100, 50]);
    }

    #[test]
    fn transfer_error_messages() {
        let e = TransferError::TooLarge { size: 10, limit: 5 };
        assert_eq!(e.to_string(), "file too large: 10 bytes exceeds limit of 5 bytes");
        assert_eq!(TransferError::rejected("HTTP 503").to_string(), "HTTP 503");
    }
}
