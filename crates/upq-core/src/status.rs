//! Queue-wide counts per state, always recomputed from the records.

use serde::Serialize;

use crate::job::{JobRecord, JobSnapshot, JobState};

/// Counts of jobs per state at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    pub retrying: usize,
}

impl QueueStatus {
    /// Count states from any sequence of job states.
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = JobState>,
    {
        let mut s = QueueStatus::default();
        for state in states {
            s.total += 1;
            match state {
                JobState::Pending => s.pending += 1,
                JobState::Uploading => s.uploading += 1,
                JobState::Retrying => s.retrying += 1,
                JobState::Completed => s.completed += 1,
                JobState::Failed => s.failed += 1,
            }
        }
        s
    }

    pub fn from_snapshots(jobs: &[JobSnapshot]) -> Self {
        Self::from_states(jobs.iter().map(|j| j.state))
    }

    pub(crate) fn from_records(records: &[JobRecord]) -> Self {
        Self::from_states(records.iter().map(|r| r.state))
    }

    /// No job is waiting, in flight, or scheduled for retry.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.uploading == 0 && self.retrying == 0
    }
}
