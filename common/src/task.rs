use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::{map, reduce, Workload};

/// The two stages of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    Map,
    Reduce,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Map => f.write_str("map"),
            JobPhase::Reduce => f.write_str("reduce"),
        }
    }
}

/// Everything a worker needs to run one task.
///
/// Descriptors are immutable once built; the scheduler hands the same one to
/// every attempt of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    job_name: String,
    phase: JobPhase,
    task_number: usize,
    /// Input file of a map task. Reduce tasks have none.
    file: Option<String>,
    /// Buckets written by a map task, or segments read by a reduce task.
    num_other: usize,
    workload: String,
    aux: Vec<String>,
}

impl TaskDescriptor {
    /// Build a descriptor from its parts, typically straight off the wire.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_name: String,
        phase: JobPhase,
        task_number: usize,
        file: Option<String>,
        num_other: usize,
        workload: String,
        aux: Vec<String>,
    ) -> anyhow::Result<Self> {
        validate_job_name(&job_name)?;
        match (phase, &file) {
            (JobPhase::Map, None) => bail!("map task {task_number} has no input file"),
            (JobPhase::Map, Some(_)) if num_other == 0 => {
                bail!("map task {task_number} must write to at least one bucket")
            }
            (JobPhase::Reduce, Some(file)) => {
                bail!("reduce task {task_number} was given an input file `{file}`")
            }
            _ => {}
        }

        Ok(Self {
            job_name,
            phase,
            task_number,
            file,
            num_other,
            workload,
            aux,
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn task_number(&self) -> usize {
        self.task_number
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn num_other(&self) -> usize {
        self.num_other
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn aux(&self) -> &[String] {
        &self.aux
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.job_name, self.phase, self.task_number)
    }
}

/// A job as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    name: String,
    workload: String,
    inputs: Vec<String>,
    n_reduce: usize,
    aux: Vec<String>,
}

impl JobSpec {
    pub fn new(
        name: impl Into<String>,
        workload: impl Into<String>,
        inputs: Vec<String>,
        n_reduce: usize,
        aux: Vec<String>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        validate_job_name(&name)?;
        if n_reduce == 0 {
            bail!("job `{name}` needs at least one reduce task");
        }

        Ok(Self {
            name,
            workload: workload.into(),
            inputs,
            n_reduce,
            aux,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn n_map(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_reduce(&self) -> usize {
        self.n_reduce
    }

    pub fn aux(&self) -> &[String] {
        &self.aux
    }

    /// One map task per input file, each fanning out to every reduce bucket.
    pub fn map_tasks(&self) -> Vec<TaskDescriptor> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(task_number, file)| TaskDescriptor {
                job_name: self.name.clone(),
                phase: JobPhase::Map,
                task_number,
                file: Some(file.clone()),
                num_other: self.n_reduce,
                workload: self.workload.clone(),
                aux: self.aux.clone(),
            })
            .collect()
    }

    /// One reduce task per bucket, each reading a segment from every map task.
    pub fn reduce_tasks(&self) -> Vec<TaskDescriptor> {
        (0..self.n_reduce)
            .map(|task_number| TaskDescriptor {
                job_name: self.name.clone(),
                phase: JobPhase::Reduce,
                task_number,
                file: None,
                num_other: self.n_map(),
                workload: self.workload.clone(),
                aux: self.aux.clone(),
            })
            .collect()
    }

    pub fn tasks(&self, phase: JobPhase) -> Vec<TaskDescriptor> {
        match phase {
            JobPhase::Map => self.map_tasks(),
            JobPhase::Reduce => self.reduce_tasks(),
        }
    }
}

/// Job names end up inside file names.
fn validate_job_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!("invalid job name `{name}`"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(anyhow!("job name `{name}` must not contain path separators"));
    }
    Ok(())
}

/// Run one task attempt on this machine.
///
/// Blocks the calling thread for the duration of the task; async callers
/// should go through `spawn_blocking`.
pub fn run_task(task: &TaskDescriptor, workload: &Workload, work_dir: &Path) -> anyhow::Result<()> {
    match task.phase {
        JobPhase::Map => {
            let file = task
                .file
                .as_deref()
                .ok_or_else(|| anyhow!("map task {} has no input file", task.task_number))?;
            map::do_map(
                work_dir,
                &task.job_name,
                task.task_number,
                file,
                task.num_other,
                workload.map_fn,
                &task.aux,
            )
        }
        JobPhase::Reduce => reduce::do_reduce(
            work_dir,
            &task.job_name,
            task.task_number,
            task.num_other,
            workload.reduce_fn,
            &task.aux,
        )
        .map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> JobSpec {
        JobSpec::new(
            "wc",
            "wc",
            vec!["a.txt".into(), "b.txt".into()],
            3,
            vec!["--flag".into()],
        )
        .unwrap()
    }

    #[test]
    fn map_tasks_fan_out_to_every_bucket() {
        let tasks = spec().map_tasks();

        assert_eq!(tasks.len(), 2);
        for (index, task) in tasks.iter().enumerate() {
            assert_eq!(task.phase(), JobPhase::Map);
            assert_eq!(task.task_number(), index);
            assert_eq!(task.num_other(), 3);
            assert_eq!(task.workload(), "wc");
            assert_eq!(task.aux(), ["--flag".to_string()]);
        }
        assert_eq!(tasks[1].file(), Some("b.txt"));
    }

    #[test]
    fn reduce_tasks_read_every_map_output() {
        let tasks = spec().reduce_tasks();

        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|task| task.file().is_none()));
        assert!(tasks.iter().all(|task| task.num_other() == 2));
        assert_eq!(spec().tasks(JobPhase::Reduce), tasks);
    }

    #[test]
    fn rejects_bad_jobs() {
        assert!(JobSpec::new("", "wc", vec![], 1, vec![]).is_err());
        assert!(JobSpec::new("../escape", "wc", vec![], 1, vec![]).is_err());
        assert!(JobSpec::new("wc", "wc", vec![], 0, vec![]).is_err());
        assert!(JobSpec::new("wc", "wc", vec![], 1, vec![]).is_ok());
    }

    #[test]
    fn wire_descriptors_are_checked() {
        let map_without_file =
            TaskDescriptor::new("wc".into(), JobPhase::Map, 0, None, 3, "wc".into(), vec![]);
        assert!(map_without_file.is_err());

        let reduce_with_file = TaskDescriptor::new(
            "wc".into(),
            JobPhase::Reduce,
            0,
            Some("a.txt".into()),
            2,
            "wc".into(),
            vec![],
        );
        assert!(reduce_with_file.is_err());

        let map_without_buckets = TaskDescriptor::new(
            "wc".into(),
            JobPhase::Map,
            0,
            Some("a.txt".into()),
            0,
            "wc".into(),
            vec![],
        );
        assert!(map_without_buckets.is_err());

        let task = TaskDescriptor::new(
            "wc".into(),
            JobPhase::Map,
            1,
            Some("b.txt".into()),
            3,
            "wc".into(),
            vec!["--flag".into()],
        )
        .unwrap();
        assert_eq!(task, spec().map_tasks()[1]);
        assert_eq!(task.to_string(), "wc/map#1");
    }
}
