use std::collections::VecDeque;
use std::path::PathBuf;

use common::job::JobState;
use common::task::JobSpec;

/// A job context.
#[derive(Debug, Clone)]
pub struct Job {
    /// What the user asked for.
    spec: JobSpec,

    /// The current state of the job.
    state: JobState,

    /// Where the merged result ends up.
    output: PathBuf,

    /// Why the job failed, if it did.
    error: Option<String>,
}

impl Job {
    pub fn new(spec: JobSpec, output: PathBuf) -> Self {
        Self {
            spec,
            state: JobState::Pending,
            output,
            error: None,
        }
    }

    pub fn get_spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn get_name(&self) -> &str {
        self.spec.name()
    }

    /// Get the state of the job.
    pub fn get_state(&self) -> JobState {
        self.state
    }

    pub fn get_output(&self) -> &PathBuf {
        &self.output
    }

    pub fn get_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Default)]
/// Job queue.
///
/// Jobs are kept in order to maintain history.
pub struct JobQueue {
    /// Job contexts.
    jobs: VecDeque<Job>,
}

impl JobQueue {
    /// Default Ctor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs which have not finished yet.
    pub fn number_of_jobs_running(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| !job.state.is_finished())
            .count()
    }

    /// Push new job. Returns `false` if a job with the same name exists.
    pub fn push_job(&mut self, job: Job) -> bool {
        if self.get_job(job.get_name()).is_some() {
            return false;
        }
        self.jobs.push_back(job);
        true
    }

    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.get_name() == name)
    }

    pub fn update_job_state(&mut self, name: &str, state: JobState) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.get_name() == name) {
            job.state = state;
        }
    }

    pub fn fail_job(&mut self, name: &str, error: String) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.get_name() == name) {
            job.state = JobState::Failed;
            job.error = Some(error);
        }
    }

    /// Get the entries of all jobs.
    pub fn get_all_jobs(&self) -> &VecDeque<Job> {
        &self.jobs
    }
}
