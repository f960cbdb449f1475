//! Executor callbacks and retry timers.
//!
//! Every callback carries the dispatch generation it belongs to. Anything
//! addressed to a job that was removed, reset, or re-dispatched since is
//! dropped, which is how a removed job is never revived.

use std::sync::Arc;

use super::{admission, Shared};
use crate::executor::{TransferError, TransferReceipt};
use crate::job::{JobId, JobState};

/// Highest progress an in-flight job can show; 100 is reserved for Completed.
const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

pub(super) fn apply_progress(shared: &Shared, id: JobId, attempt: u64, percent: u8) {
    let mut guard = shared.lock();
    let state = &mut *guard;
    let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
        return;
    };
    if !record.is_uploading(attempt) {
        return;
    }
    let percent = percent.min(MAX_IN_FLIGHT_PROGRESS);
    if percent <= record.progress {
        return;
    }
    record.progress = percent;
    state.observers.progress(&record.snapshot());
}

/// Apply the terminal outcome of one dispatch, free its slot, and re-run admission.
pub(super) fn finish(
    shared: &Arc<Shared>,
    id: JobId,
    attempt: u64,
    result: Result<TransferReceipt, TransferError>,
) {
    {
        let mut guard = shared.lock();
        let state = &mut *guard;
        if !state.in_flight.remove(&attempt) {
            tracing::warn!(job_id = id.get(), attempt, "duplicate transfer outcome ignored");
            return;
        }
        let max_retries = shared.config.max_retries;
        let record = state.records.iter_mut().find(|r| r.id == id);
        match record {
            Some(record) if record.is_uploading(attempt) => {
                match result {
                    Ok(receipt) => {
                        tracing::info!(
                            job_id = id.get(),
                            location = %receipt.location,
                            bytes = receipt.bytes,
                            "upload completed"
                        );
                        record.state = JobState::Completed;
                        record.progress = 100;
                        record.result = Some(receipt);
                        record.error = None;
                    }
                    Err(err) => {
                        record.error = Some(err.to_string());
                        if record.retry_count < max_retries {
                            record.retry_count += 1;
                            record.state = JobState::Retrying;
                            tracing::warn!(
                                job_id = id.get(),
                                retry = record.retry_count,
                                max_retries,
                                error = %err,
                                "upload failed, retry scheduled"
                            );
                            let timer = schedule_retry(shared, id, attempt);
                            if let Some(old) = state.retry_timers.insert(id, timer) {
                                old.abort();
                            }
                        } else {
                            record.state = JobState::Failed;
                            tracing::warn!(
                                job_id = id.get(),
                                retries = record.retry_count,
                                error = %err,
                                "upload failed, retries exhausted"
                            );
                        }
                    }
                }
                state.observers.status_changed(&record.snapshot());
            }
            _ => {
                tracing::debug!(job_id = id.get(), attempt, "outcome for removed job discarded");
            }
        }
        shared.publish_status(state);
    }
    admission::run(shared);
}

/// Spawn the delay timer that moves a Retrying job back to Pending.
fn schedule_retry(shared: &Arc<Shared>, id: JobId, attempt: u64) -> tokio::task::AbortHandle {
    let delay = shared.config.retry_delay();
    let weak = Arc::downgrade(shared);
    shared
        .runtime
        .spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                retry_due(&shared, id, attempt);
            }
        })
        .abort_handle()
}

fn retry_due(shared: &Arc<Shared>, id: JobId, attempt: u64) {
    {
        let mut guard = shared.lock();
        let state = &mut *guard;
        let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.id == id && r.attempt == attempt && r.state == JobState::Retrying)
        else {
            return;
        };
        record.state = JobState::Pending;
        record.progress = 0;
        tracing::debug!(job_id = id.get(), retry = record.retry_count, "retry delay elapsed");
        state.observers.status_changed(&record.snapshot());
        state.retry_timers.remove(&id);
        shared.publish_status(state);
    }
    admission::run(shared);
}
