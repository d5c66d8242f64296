//! Fault-tolerant dispatch of one phase's tasks to remote workers.
//!
//! Every task gets its own runner. A runner borrows an idle worker from the
//! shared [`AddressSource`], asks it to run the task and, whatever the
//! outcome, hands the worker back. Failed attempts are retried on the next
//! idle worker, without limit and without backoff, so a phase finishes as
//! long as healthy workers keep showing up. A runner that dies (a panicking
//! invoker) is restarted, and the worker it held goes back to the pool.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::address::AddressSource;
use crate::task::TaskDescriptor;

/// Why a task attempt did not succeed.
///
/// The scheduler retries every variant the same way; the distinction only
/// shows up in the logs.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("worker {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("call to worker {address} failed: {reason}")]
    Transport { address: String, reason: String },

    #[error("worker {address} failed task {task}")]
    TaskFailed { address: String, task: String },
}

/// Runs a task on a given worker and waits for its verdict.
#[async_trait]
pub trait TaskInvoker: Send + Sync + 'static {
    async fn invoke(&self, address: &str, task: &TaskDescriptor) -> Result<(), InvokeError>;
}

/// Counts distinct successful task indices of one phase.
///
/// A barrier belongs to a single [`schedule`] call; phases never share one.
#[derive(Debug)]
pub struct CompletionBarrier {
    total: usize,
    done: Mutex<HashSet<usize>>,
    completed: watch::Sender<usize>,
}

impl CompletionBarrier {
    pub fn new(total: usize) -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            total,
            done: Mutex::new(HashSet::with_capacity(total)),
            completed,
        }
    }

    /// Record that task `index` succeeded.
    ///
    /// Returns `false`, and changes nothing, if the index was already
    /// recorded or is out of range.
    pub fn mark_done(&self, index: usize) -> bool {
        if index >= self.total {
            return false;
        }

        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if !done.insert(index) {
            return false;
        }
        self.completed.send_replace(done.len());
        true
    }

    pub fn completed(&self) -> usize {
        *self.completed.borrow()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }

    /// Wait until every index in `0..total` has been marked.
    pub async fn wait(&self) {
        let mut completed = self.completed.subscribe();
        loop {
            let done = *completed.borrow_and_update();
            if done >= self.total {
                return;
            }
            // The sender lives in `self`, so the channel cannot close under us.
            if completed.changed().await.is_err() {
                return;
            }
        }
    }
}

/// What happened while running a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseReport {
    /// Tasks that succeeded, always the number of tasks scheduled.
    pub completed: usize,

    /// Attempts that failed and were retried.
    pub failed_attempts: usize,
}

/// Run every task to success on the workers supplied by `addresses`.
///
/// Returns once each task index has succeeded exactly once. There is no
/// timeout: if no worker ever succeeds, this never returns.
pub async fn schedule(
    tasks: Vec<TaskDescriptor>,
    addresses: &AddressSource,
    invoker: Arc<dyn TaskInvoker>,
) -> PhaseReport {
    let Some(first) = tasks.first() else {
        return PhaseReport {
            completed: 0,
            failed_attempts: 0,
        };
    };
    let phase = format!("{} {}", first.job_name(), first.phase());
    let count = tasks.len();

    info!("Schedule: {count} {phase} tasks ({} I/Os)", first.num_other());

    let barrier = Arc::new(CompletionBarrier::new(count));
    let failed_attempts = Arc::new(AtomicUsize::new(0));
    let mut runners = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        runners.spawn(supervise(
            index,
            task,
            addresses.clone(),
            invoker.clone(),
            barrier.clone(),
            failed_attempts.clone(),
        ));
    }

    barrier.wait().await;

    while let Some(result) = runners.join_next().await {
        if let Err(e) = result {
            error!("A {phase} runner ended abnormally after the phase completed: {e}");
        }
    }

    let report = PhaseReport {
        completed: barrier.completed(),
        failed_attempts: failed_attempts.load(Ordering::Relaxed),
    };
    info!(
        "Schedule: {phase} phase done ({} failed attempts)",
        report.failed_attempts
    );

    report
}

/// Keep a runner alive for task `index` until it returns normally.
///
/// The restarted runner starts only after the dead one is gone, so attempts
/// of a task stay serial.
async fn supervise(
    index: usize,
    task: TaskDescriptor,
    addresses: AddressSource,
    invoker: Arc<dyn TaskInvoker>,
    barrier: Arc<CompletionBarrier>,
    failed_attempts: Arc<AtomicUsize>,
) {
    loop {
        // Dropping the set aborts the runner along with its supervisor.
        let mut runner = JoinSet::new();
        runner.spawn(run_until_success(
            index,
            task.clone(),
            addresses.clone(),
            invoker.clone(),
            barrier.clone(),
            failed_attempts.clone(),
        ));

        match runner.join_next().await {
            Some(Err(e)) if e.is_panic() => {
                failed_attempts.fetch_add(1, Ordering::Relaxed);
                error!("Runner of {task} died, restarting it: {e}");
            }
            _ => return,
        }
    }
}

/// Retry loop of a single task. Only one attempt of a task is ever in flight.
async fn run_until_success(
    index: usize,
    task: TaskDescriptor,
    addresses: AddressSource,
    invoker: Arc<dyn TaskInvoker>,
    barrier: Arc<CompletionBarrier>,
    failed_attempts: Arc<AtomicUsize>,
) {
    loop {
        // The lease hands the worker back on every path out of this
        // iteration, unwinding included.
        let address = addresses.lease().await;
        debug!("Dispatching {task} to {}", &*address);

        match invoker.invoke(&address, &task).await {
            Ok(()) => {
                drop(address);
                if !barrier.mark_done(index) {
                    warn!("Ignoring duplicate completion of {task}");
                }
                return;
            }
            Err(e) => {
                failed_attempts.fetch_add(1, Ordering::Relaxed);
                warn!("{task} failed, retrying elsewhere: {e}");
                // The worker may only have hiccuped; if it is really gone,
                // later attempts on it fail the same way.
                drop(address);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::sync::atomic::AtomicBool;

    use tokio::time::timeout;

    use super::*;
    use crate::task::JobSpec;

    #[test]
    fn barrier_counts_each_index_once() {
        let barrier = CompletionBarrier::new(3);

        assert!(barrier.mark_done(1));
        assert!(!barrier.mark_done(1));
        assert!(!barrier.mark_done(3));
        assert_eq!(barrier.completed(), 1);
        assert!(!barrier.is_complete());

        assert!(barrier.mark_done(0));
        assert!(barrier.mark_done(2));
        assert!(barrier.is_complete());
        assert_eq!(barrier.total(), 3);
    }

    #[tokio::test]
    async fn barrier_releases_only_when_all_indices_are_done() {
        let barrier = Arc::new(CompletionBarrier::new(2));
        let waiter = tokio::spawn({
            let barrier = barrier.clone();
            async move { barrier.wait().await }
        });

        barrier.mark_done(0);
        barrier.mark_done(0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.mark_done(1);
        timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn empty_barrier_is_already_open() {
        timeout(Duration::from_secs(1), CompletionBarrier::new(0).wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn barriers_do_not_share_state() {
        let first = CompletionBarrier::new(1);
        let second = CompletionBarrier::new(1);

        first.mark_done(0);

        assert!(first.is_complete());
        assert_eq!(second.completed(), 0);
    }

    struct AlwaysOk;

    #[async_trait]
    impl TaskInvoker for AlwaysOk {
        async fn invoke(&self, _address: &str, _task: &TaskDescriptor) -> Result<(), InvokeError> {
            Ok(())
        }
    }

    /// Panics on the first attempt of task 0, succeeds otherwise.
    struct PanicsOnce {
        panicked: AtomicBool,
    }

    #[async_trait]
    impl TaskInvoker for PanicsOnce {
        async fn invoke(&self, _address: &str, task: &TaskDescriptor) -> Result<(), InvokeError> {
            if task.task_number() == 0 && !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("invoker bug");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dead_runner_is_restarted_and_its_worker_returned() {
        let spec = JobSpec::new(
            "wc",
            "wc",
            vec!["a.txt".into(), "b.txt".into(), "c.txt".into()],
            2,
            vec![],
        )
        .unwrap();
        let addresses = AddressSource::with_addresses(["w1", "w2"]);
        let invoker = Arc::new(PanicsOnce {
            panicked: AtomicBool::new(false),
        });

        let report = timeout(
            Duration::from_secs(5),
            schedule(spec.map_tasks(), &addresses, invoker.clone()),
        )
        .await
        .unwrap();

        assert!(invoker.panicked.load(Ordering::SeqCst));
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed_attempts, 1);
        assert_eq!(addresses.available(), 2);
    }

    #[tokio::test]
    async fn no_tasks_means_no_workers_needed() {
        let report = timeout(
            Duration::from_secs(1),
            schedule(Vec::new(), &AddressSource::new(), Arc::new(AlwaysOk)),
        )
        .await
        .unwrap();

        assert_eq!(report.completed, 0);
    }
}
