use tracing::{debug, info};

use common::address::AddressSource;

/// Registry for workers.
///
/// Every registered worker is fed into the shared [`AddressSource`] once;
/// from then on the schedulers pass it around between tasks.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    /// Addresses of the workers' gRPC servers, in registration order.
    worker_list: Vec<String>,

    /// Idle workers, shared by every running job.
    addresses: AddressSource,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add worker to the registry and return how many workers are known.
    ///
    /// A worker that registers again (e.g. after a restart) is not handed out
    /// twice.
    pub fn register_worker(&mut self, address: String) -> usize {
        if self.worker_list.contains(&address) {
            debug!("Worker {address} registered again");
            return self.len();
        }

        info!("Registered worker {address}");
        self.addresses.release(address.clone());
        self.worker_list.push(address);
        self.len()
    }

    /// Handle on the idle worker pool.
    pub fn addresses(&self) -> AddressSource {
        self.addresses.clone()
    }

    /// Number of workers known, busy or not.
    pub fn len(&self) -> usize {
        self.worker_list.len()
    }

    /// Number of workers currently waiting for a task.
    pub fn idle(&self) -> usize {
        self.addresses.available()
    }
}
