//! Upload queue manager.
//!
//! Owns the ordered job collection, admits Pending jobs into a bounded
//! number of concurrency slots (FIFO by submission order), applies executor
//! outcomes, schedules delayed retries, and notifies observers.
//!
//! All mutations go through one `std::sync::Mutex`. It is never held across
//! an `.await` or the executor call, so admission is a short critical
//! section: claim a slot, mark the job Uploading, notify, repeat; the
//! executor futures are started after the lock is released.

mod admission;
mod error;
mod outcome;


pub use error::QueueError;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::config::QueueConfig;
use crate::executor::TransferExecutor;
use crate::job::{JobId, JobRecord, JobSnapshot, JobState, Payload};
use crate::observer::{ChannelObserver, EventKind, Observers, QueueEvent, QueueObserver};
use crate::status::QueueStatus;

/// Mutable queue state guarded by the manager's mutex.
pub(crate) struct QueueState {
    /// Records in submission order.
    records: Vec<JobRecord>,
    next_id: u64,
    next_attempt: u64,
    /// Dispatch generations whose executor call has not resolved yet. Its
    /// size is the number of occupied slots; a removed job's call keeps
    /// its slot until it resolves.
    in_flight: HashSet<u64>,
    /// Pending retry-delay timers per job.
    retry_timers: HashMap<JobId, AbortHandle>,
    observers: Observers,
}

impl QueueState {
    fn cancel_retry_timer(&mut self, id: JobId) {
        if let Some(timer) = self.retry_timers.remove(&id) {
            timer.abort();
        }
    }
}

pub(crate) struct Shared {
    config: QueueConfig,
    executor: Arc<dyn TransferExecutor>,
    runtime: tokio::runtime::Handle,
    state: Mutex<QueueState>,
    status_tx: watch::Sender<QueueStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the current counts; call with the lock held after any mutation.
    fn publish_status(&self, state: &QueueState) {
        self.status_tx
            .send_replace(QueueStatus::from_records(&state.records));
    }
}

/// Handle to an upload queue. Cloning is cheap; all clones drive the same queue.
#[derive(Clone)]
pub struct QueueManager {
    shared: Arc<Shared>,
}

impl QueueManager {
    /// Build a queue for `executor`. Must be called from within a tokio runtime;
    /// executor calls and retry timers are spawned on it.
    pub fn new(
        config: QueueConfig,
        executor: Arc<dyn TransferExecutor>,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let (status_tx, _) = watch::channel(QueueStatus::default());
        tracing::debug!(
            max_concurrent = config.max_concurrent,
            max_retries = config.max_retries,
            retry_delay_ms = config.retry_delay_ms,
            "upload queue created"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                executor,
                runtime,
                state: Mutex::new(QueueState {
                    records: Vec::new(),
                    next_id: 1,
                    next_attempt: 1,
                    in_flight: HashSet::new(),
                    retry_timers: HashMap::new(),
                    observers: Observers::default(),
                }),
                status_tx,
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Register an observer for progress and status notifications.
    ///
    /// The observer is invoked while the queue lock is held and must not call
    /// back into this manager.
    pub fn subscribe(&self, observer: Arc<dyn QueueObserver>) {
        let mut state = self.shared.lock();
        state.observers.register(observer);
        tracing::debug!(observers = state.observers.len(), "observer registered");
    }

    /// Receive notifications of the given kinds over a channel.
    pub fn subscribe_channel(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<QueueEvent> {
        let (observer, rx) = ChannelObserver::new(kinds);
        self.subscribe(Arc::new(observer));
        rx
    }

    /// Watch queue-wide counts; updated after every mutation.
    pub fn watch_status(&self) -> watch::Receiver<QueueStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Add payloads as Pending jobs in the given order and start admission.
    pub fn submit<I>(&self, payloads: I) -> Vec<JobId>
    where
        I: IntoIterator<Item = Payload>,
    {
        let ids = {
            let mut state = self.shared.lock();
            let mut ids = Vec::new();
            for payload in payloads {
                let id = JobId(state.next_id);
                state.next_id += 1;
                tracing::debug!(job_id = id.get(), name = %payload.name, size = payload.size, "job submitted");
                state.records.push(JobRecord::new(id, payload));
                ids.push(id);
            }
            self.shared.publish_status(&state);
            ids
        };
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "submitted jobs");
        }
        admission::run(&self.shared);
        ids
    }

    /// Reset every Failed job to Pending (retry count, error and progress
    /// cleared) and start admission. Returns how many jobs were reset.
    pub fn retry_failed(&self) -> usize {
        let reset = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            let mut reset = 0;
            for record in state.records.iter_mut() {
                if record.state != JobState::Failed {
                    continue;
                }
                record.reset_for_retry();
                reset += 1;
                state.observers.status_changed(&record.snapshot());
            }
            self.shared.publish_status(state);
            reset
        };
        tracing::info!(count = reset, "retrying failed jobs");
        admission::run(&self.shared);
        reset
    }

    /// Remove every Completed job. Returns how many were removed.
    pub fn clear_completed(&self) -> usize {
        let mut state = self.shared.lock();
        let before = state.records.len();
        state.records.retain(|r| r.state != JobState::Completed);
        let removed = before - state.records.len();
        self.shared.publish_status(&state);
        tracing::debug!(count = removed, "cleared completed jobs");
        removed
    }

    /// Remove a job in any state. A pending retry timer is cancelled; an
    /// in-flight transfer keeps running but its callbacks are discarded.
    /// Returns false if no job has this id.
    pub fn remove(&self, id: JobId) -> bool {
        let mut state = self.shared.lock();
        let Some(idx) = state.records.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = state.records.remove(idx);
        state.cancel_retry_timer(id);
        self.shared.publish_status(&state);
        tracing::debug!(job_id = id.get(), state = %record.state, "job removed");
        true
    }

    /// Counts per state, consistent with the collection at this instant.
    pub fn status(&self) -> QueueStatus {
        QueueStatus::from_records(&self.shared.lock().records)
    }

    /// Snapshots of all jobs in submission order.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.shared
            .lock()
            .records
            .iter()
            .map(JobRecord::snapshot)
            .collect()
    }

    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.shared
            .lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .map(JobRecord::snapshot)
    }

    /// Wait until no job is Pending, Uploading, or Retrying.
    pub async fn wait_idle(&self) {
        let mut rx = self.watch_status();
        // The sender lives in `shared`, which `self` keeps alive.
        let _ = rx.wait_for(QueueStatus::is_idle).await;
    }
}
