use std::collections::VecDeque;
use std::ops::Deref;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Shared supply of idle worker addresses.
///
/// Any number of producers (worker registration, task runners handing a
/// worker back) and consumers (task runners looking for a worker) may use it
/// concurrently. Handing an address back never waits: the queue is
/// unbounded, so a runner can always release its worker and move on.
#[derive(Debug, Clone, Default)]
pub struct AddressSource {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    queue: Mutex<VecDeque<String>>,
    available: Notify,
}

impl AddressSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source already holding the given addresses, in order.
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = Self::new();
        for address in addresses {
            source.release(address);
        }
        source
    }

    /// Put an address (back) into the pool without waiting for a consumer.
    pub fn release(&self, address: impl Into<String>) {
        self.queue().push_back(address.into());
        self.inner.available.notify_one();
    }

    /// Take the next idle address, waiting until one is released if the
    /// pool is empty.
    pub async fn acquire(&self) -> String {
        loop {
            // Register as a waiter before looking at the queue, so every
            // release after the check wakes a distinct consumer.
            let mut notified = pin!(self.inner.available.notified());
            notified.as_mut().enable();

            if let Some(address) = self.try_acquire() {
                return address;
            }
            notified.await;
        }
    }

    /// Take an address only if one is idle right now.
    pub fn try_acquire(&self) -> Option<String> {
        let mut queue = self.queue();
        let address = queue.pop_front()?;
        if !queue.is_empty() {
            // Pass the wakeup on: an earlier release may have been absorbed
            // by a consumer that found its address without sleeping.
            self.inner.available.notify_one();
        }
        Some(address)
    }

    /// Like [`acquire`](Self::acquire), but the address goes back to the
    /// pool when the returned lease is dropped, even if the holder panics or
    /// is cancelled.
    pub async fn lease(&self) -> Lease {
        Lease {
            address: Some(self.acquire().await),
            source: self.clone(),
        }
    }

    /// Number of idle addresses at this instant.
    pub fn available(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// An address borrowed from an [`AddressSource`].
#[derive(Debug)]
pub struct Lease {
    address: Option<String>,
    source: AddressSource,
}

impl Deref for Lease {
    type Target = str;

    fn deref(&self) -> &str {
        self.address.as_deref().unwrap_or_default()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(address) = self.address.take() {
            self.source.release(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn hands_out_addresses_in_release_order() {
        let source = AddressSource::with_addresses(["w1", "w2"]);
        source.release("w3");

        assert_eq!(source.available(), 3);
        assert_eq!(source.acquire().await, "w1");
        assert_eq!(source.acquire().await, "w2");
        assert_eq!(source.try_acquire().as_deref(), Some("w3"));
        assert_eq!(source.try_acquire(), None);
    }

    #[tokio::test]
    async fn acquire_waits_for_a_release() {
        let source = AddressSource::new();
        let waiter = tokio::spawn({
            let source = source.clone();
            async move { source.acquire().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        source.release("late-worker");
        let address = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert_eq!(address, "late-worker");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_release_reaches_exactly_one_consumer() {
        let source = AddressSource::new();
        let consumers: Vec<_> = (0..32)
            .map(|_| {
                let source = source.clone();
                tokio::spawn(async move { source.acquire().await })
            })
            .collect();

        for i in 0..32 {
            source.release(format!("w{i}"));
        }

        let mut got = Vec::new();
        for consumer in consumers {
            got.push(timeout(Duration::from_secs(5), consumer).await.unwrap().unwrap());
        }
        got.sort();
        got.dedup();
        assert_eq!(got.len(), 32);
        assert_eq!(source.available(), 0);
    }

    #[tokio::test]
    async fn simultaneous_releases_wake_every_sleeper() {
        let source = AddressSource::new();
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let source = source.clone();
                tokio::spawn(async move { source.acquire().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // No consumer gets to run between these releases.
        source.release("w1");
        source.release("w2");
        source.release("w3");

        for consumer in consumers {
            timeout(Duration::from_secs(5), consumer).await.unwrap().unwrap();
        }
        assert_eq!(source.available(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_consumer_sleeps_while_addresses_are_idle() {
        for round in 0..500 {
            let source = AddressSource::new();
            let consumers: Vec<_> = (0..8)
                .map(|_| {
                    let source = source.clone();
                    tokio::spawn(async move { source.acquire().await })
                })
                .collect();

            let producer = std::thread::spawn({
                let source = source.clone();
                move || {
                    for i in 0..8 {
                        source.release(format!("w{i}"));
                    }
                }
            });
            producer.join().unwrap();

            for consumer in consumers {
                let acquired = timeout(Duration::from_secs(5), consumer).await;
                assert!(acquired.is_ok(), "round {round}: a consumer slept past an idle address");
            }
            assert_eq!(source.available(), 0);
        }
    }

    #[tokio::test]
    async fn lease_returns_the_address_when_dropped() {
        let source = AddressSource::with_addresses(["w1"]);

        let lease = source.lease().await;
        assert_eq!(&*lease, "w1");
        assert_eq!(source.available(), 0);

        drop(lease);
        assert_eq!(source.try_acquire().as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn lease_survives_a_panicking_holder() {
        let source = AddressSource::with_addresses(["w1"]);

        let holder = tokio::spawn({
            let source = source.clone();
            async move {
                let _lease = source.lease().await;
                panic!("holder crashed");
            }
        });

        assert!(holder.await.unwrap_err().is_panic());
        assert_eq!(source.available(), 1);
    }

    #[test]
    fn release_never_blocks_without_consumers() {
        let source = AddressSource::new();
        for i in 0..10_000 {
            source.release(format!("w{i}"));
        }
        assert_eq!(source.available(), 10_000);
    }
}
