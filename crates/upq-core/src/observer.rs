//! Notification delivery: observer registration plus a channel adapter.
//!
//! The queue emits immutable [`JobSnapshot`]s. Delivery is synchronous and
//! happens while the queue still holds its lock, so per-job ordering matches
//! transition order. Callback observers must therefore not call back into
//! the queue; consumers that need to (UIs, loggers) use
//! [`ChannelObserver`] via `QueueManager::subscribe_channel`.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::job::JobSnapshot;

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Progress percentage changed during a transfer.
    Progress,
    /// Job changed lifecycle state.
    StatusChange,
}

/// A notification carrying the job's full snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Progress(JobSnapshot),
    StatusChanged(JobSnapshot),
}

impl QueueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            QueueEvent::Progress(_) => EventKind::Progress,
            QueueEvent::StatusChanged(_) => EventKind::StatusChange,
        }
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            QueueEvent::Progress(s) | QueueEvent::StatusChanged(s) => s,
        }
    }
}

/// Receives job notifications. Both methods default to no-ops so an observer
/// can subscribe to either kind or both.
pub trait QueueObserver: Send + Sync {
    fn on_progress(&self, _job: &JobSnapshot) {}

    fn on_status_change(&self, _job: &JobSnapshot) {}

    /// Observers reporting `true` are dropped from the registry.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Forwards selected notification kinds into an unbounded tokio channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<QueueEvent>,
    progress: bool,
    status: bool,
}

impl ChannelObserver {
    pub fn new(kinds: &[EventKind]) -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Self {
            tx,
            progress: kinds.contains(&EventKind::Progress),
            status: kinds.contains(&EventKind::StatusChange),
        };
        (observer, rx)
    }
}

impl QueueObserver for ChannelObserver {
    fn on_progress(&self, job: &JobSnapshot) {
        if self.progress {
            let _ = self.tx.send(QueueEvent::Progress(job.clone()));
        }
    }

    fn on_status_change(&self, job: &JobSnapshot) {
        if self.status {
            let _ = self.tx.send(QueueEvent::StatusChanged(job.clone()));
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Registry of observers, owned by the queue state.
#[derive(Default)]
pub(crate) struct Observers {
    list: Vec<Arc<dyn QueueObserver>>,
}

impl Observers {
    pub(crate) fn register(&mut self, observer: Arc<dyn QueueObserver>) {
        self.list.retain(|o| !o.is_closed());
        self.list.push(observer);
    }

    pub(crate) fn progress(&mut self, job: &JobSnapshot) {
        self.list.retain(|o| !o.is_closed());
        for o in &self.list {
            o.on_progress(job);
        }
    }

    pub(crate) fn status_changed(&mut self, job: &JobSnapshot) {
        self.list.retain(|o| !o.is_closed());
        for o in &self.list {
            o.on_status_change(job);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobState, Payload};

    fn snap(id: u64, state: JobState) -> JobSnapshot {
        JobSnapshot {
            id: JobId(id),
            payload: Payload::new("f.bin", 1, "/tmp/f.bin"),
            state,
            progress: 0,
            retry_count: 0,
            error: None,
            result: None,
        }
    }

    #[test]
    fn channel_observer_filters_kinds() {
        let (obs, mut rx) = ChannelObserver::new(&[EventKind::StatusChange]);
        obs.on_progress(&snap(1, JobState::Uploading));
        obs.on_status_change(&snap(1, JobState::Completed));
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind(), EventKind::StatusChange);
        assert_eq!(ev.snapshot().state, JobState::Completed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channels_are_pruned() {
        let mut observers = Observers::default();
        let (obs, rx) = ChannelObserver::new(&[EventKind::Progress]);
        observers.register(Arc::new(obs));
        assert_eq!(observers.len(), 1);
        drop(rx);
        observers.progress(&snap(2, JobState::Uploading));
        assert_eq!(observers.len(), 0);
    }
}
