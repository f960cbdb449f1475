//! Job identifier and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job identifier. Assigned by the queue manager at submission and never
/// reused within one manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub(crate) u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a job.
///
/// Pending → Uploading on admission; Uploading → Completed | Retrying | Failed
/// on the executor outcome; Retrying → Pending when the retry delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Uploading,
    Retrying,
    Completed,
    Failed,
}

/// Display tone for a state, for renderers that colour status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Subdued,
    Highlight,
    Warning,
    Success,
    Critical,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Uploading => "uploading",
            JobState::Retrying => "retrying",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Capitalized label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            JobState::Pending => "Pending",
            JobState::Uploading => "Uploading",
            JobState::Retrying => "Retrying",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
        }
    }

    pub fn tone(self) -> StatusTone {
        match self {
            JobState::Pending => StatusTone::Subdued,
            JobState::Uploading => StatusTone::Highlight,
            JobState::Retrying => StatusTone::Warning,
            JobState::Completed => StatusTone::Success,
            JobState::Failed => StatusTone::Critical,
        }
    }

    /// Completed and Failed accept no automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
