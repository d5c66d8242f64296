use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// State of a job as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Job accepted, no task dispatched yet.
    Pending,

    /// Map phase in flight.
    Mapping,

    /// Reduce phase in flight.
    Reducing,

    /// Reduce outputs are being merged into the final file.
    Merging,

    /// Final output written.
    Completed,

    /// The job could not produce its final output.
    Failed,
}

impl JobState {
    /// Whether the job will never change state again.
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Mapping => "mapping",
            JobState::Reducing => "reducing",
            JobState::Merging => "merging",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "mapping" => Ok(JobState::Mapping),
            "reducing" => Ok(JobState::Reducing),
            "merging" => Ok(JobState::Merging),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(anyhow!("unknown job state `{other}`")),
        }
    }
}
