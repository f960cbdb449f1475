//! Test executors and observers shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use upq_core::{
    JobId, JobSnapshot, JobState, Payload, ProgressReporter, QueueObserver, TransferError,
    TransferExecutor, TransferFuture, TransferReceipt,
};

/// What one executor call for a payload does.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(&'static str),
    /// Stay in flight until `ScriptedExecutor::release`, then succeed.
    Hold,
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    held: Mutex<HashMap<String, VecDeque<oneshot::Sender<()>>>>,
    delay: Mutex<Duration>,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

/// Executor that follows a per-payload script (default: succeed) and records
/// call order and peak concurrency.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    inner: Arc<Inner>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each call sleeps this long before resolving.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock().unwrap() = delay;
        self
    }

    pub fn script(&self, name: &str, steps: impl IntoIterator<Item = Step>) {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), steps.into_iter().collect());
    }

    /// Let the oldest held call for `name` finish successfully.
    pub fn release(&self, name: &str) {
        let tx = self
            .inner
            .held
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("no held call for {name}"));
        let _ = tx.send(());
    }

    pub fn started(&self) -> Vec<String> {
        self.inner.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.inner.finished.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.inner.max_running.load(Ordering::SeqCst)
    }

    fn next_step(&self, name: &str) -> Step {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Succeed)
    }
}

impl TransferExecutor for ScriptedExecutor {
    fn execute(&self, payload: Payload, progress: ProgressReporter) -> TransferFuture {
        let name = payload.name.clone();
        let step = self.next_step(&name);
        let inner = Arc::clone(&self.inner);
        inner.started.lock().unwrap().push(name.clone());
        let now = inner.running.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_running.fetch_max(now, Ordering::SeqCst);

        let held = match step {
            Step::Hold => {
                let (tx, rx) = oneshot::channel();
                inner
                    .held
                    .lock()
                    .unwrap()
                    .entry(name.clone())
                    .or_default()
                    .push_back(tx);
                Some(rx)
            }
            _ => None,
        };
        let delay = *inner.delay.lock().unwrap();

        Box::pin(async move {
            progress.report(10);
            if let Some(rx) = held {
                let _ = rx.await;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            progress.report(50);
            inner.running.fetch_sub(1, Ordering::SeqCst);
            inner.finished.lock().unwrap().push(name.clone());
            match step {
                Step::Fail(msg) => Err(TransferError::rejected(msg)),
                Step::Succeed | Step::Hold => Ok(TransferReceipt::new(
                    format!("mem://{}", name),
                    payload.size,
                )),
            }
        })
    }
}

/// Observer recording every status change and the peak number of jobs
/// simultaneously in Uploading.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(String, JobState)>>,
    uploading: Mutex<HashSet<JobId>>,
    max_uploading: AtomicUsize,
    progress: Mutex<Vec<(String, u8)>>,
}

impl Recorder {
    pub fn states_of(&self, name: &str) -> Vec<JobState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn max_uploading(&self) -> usize {
        self.max_uploading.load(Ordering::SeqCst)
    }

    pub fn progress_of(&self, name: &str) -> Vec<u8> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl QueueObserver for Recorder {
    fn on_progress(&self, job: &JobSnapshot) {
        self.progress
            .lock()
            .unwrap()
            .push((job.payload.name.clone(), job.progress));
    }

    fn on_status_change(&self, job: &JobSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push((job.payload.name.clone(), job.state));
        let mut uploading = self.uploading.lock().unwrap();
        if job.state == JobState::Uploading {
            uploading.insert(job.id);
        } else {
            uploading.remove(&job.id);
        }
        self.max_uploading.fetch_max(uploading.len(), Ordering::SeqCst);
    }
}

pub fn payload(name: &str) -> Payload {
    Payload::new(name, 100, format!("/data/{name}"))
}

/// Let spawned transfer tasks run.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
