//! Admission pass: fill free concurrency slots with the earliest Pending jobs.

use std::sync::Arc;

use super::{outcome, Shared};
use crate::executor::{ProgressReporter, TransferError};
use crate::job::{JobId, JobState, Payload};

/// A job claimed for a slot, ready to hand to the executor.
struct Dispatch {
    id: JobId,
    attempt: u64,
    payload: Payload,
}

/// Run one admission pass.
///
/// Claiming happens entirely under the lock, so concurrent passes (e.g. two
/// transfers completing at once) cannot over-admit or dispatch a job twice.
pub(super) fn run(shared: &Arc<Shared>) {
    let dispatches = claim(shared);
    for d in dispatches {
        start(shared, d);
    }
}

fn claim(shared: &Shared) -> Vec<Dispatch> {
    let mut guard = shared.lock();
    let state = &mut *guard;
    let mut claimed = Vec::new();
    while state.in_flight.len() < shared.config.max_concurrent {
        let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.state == JobState::Pending)
        else {
            break;
        };
        let attempt = state.next_attempt;
        state.next_attempt += 1;
        state.in_flight.insert(attempt);

        record.state = JobState::Uploading;
        record.progress = 0;
        record.attempt = attempt;
        tracing::debug!(
            job_id = record.id.get(),
            attempt,
            retry_count = record.retry_count,
            "job admitted"
        );
        // Delivered before the next slot is claimed.
        state.observers.status_changed(&record.snapshot());
        claimed.push(Dispatch {
            id: record.id,
            attempt,
            payload: record.payload.clone(),
        });
    }
    if !claimed.is_empty() {
        shared.publish_status(state);
    }
    claimed
}

/// Hand a claimed job to the executor and drive its future on the runtime.
fn start(shared: &Arc<Shared>, dispatch: Dispatch) {
    let Dispatch {
        id,
        attempt,
        payload,
    } = dispatch;

    let reporter = {
        let weak = Arc::downgrade(shared);
        ProgressReporter::new(move |percent| {
            if let Some(shared) = weak.upgrade() {
                outcome::apply_progress(&shared, id, attempt, percent);
            }
        })
    };

    // The executor is invoked inside its own task so a panic, whether in
    // `execute` or in the returned future, still produces an outcome.
    let executor = Arc::clone(&shared.executor);
    let transfer = shared
        .runtime
        .spawn(async move { executor.execute(payload, reporter).await });
    let weak = Arc::downgrade(shared);
    shared.runtime.spawn(async move {
        let result = match transfer.await {
            Ok(result) => result,
            Err(e) => Err(TransferError::rejected(format!("transfer task failed: {}", e))),
        };
        match weak.upgrade() {
            Some(shared) => outcome::finish(&shared, id, attempt, result),
            None => tracing::debug!(job_id = id.get(), "queue dropped before transfer finished"),
        }
    });
}
