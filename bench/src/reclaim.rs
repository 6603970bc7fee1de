use flume::{unbounded, Receiver, Sender};
use std::fmt::{Debug, Formatter};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{trace, warn};

/// Destroys handed-off values on a dedicated thread, in the order they were
/// pushed, so the pushing side never pays for deallocation.
///
/// The queue is unbounded. The worker runs until every handle is dropped and
/// the queue is empty, which for a flow means the rest of the process.
pub struct ReclaimQueue<T: Send + 'static> {
    name: Arc<str>,
    sender: Sender<T>,
    reclaimed: Arc<AtomicU64>,
}

impl<T: Send + 'static> ReclaimQueue<T> {
    pub fn new(name: &str) -> io::Result<Self> {
        let (sender, receiver) = unbounded();
        let reclaimed = Arc::new(AtomicU64::new(0));
        let worker_reclaimed = reclaimed.clone();
        thread::Builder::new()
            .name(format!("reclaim-{name}"))
            .spawn(move || Self::run(receiver, worker_reclaimed))?;

        Ok(Self {
            name: Arc::from(name),
            sender,
            reclaimed,
        })
    }

    /// Moves `value` into the queue and wakes the worker.
    pub fn push(&self, value: T) {
        if let Err(flume::SendError(value)) = self.sender.send(value) {
            warn!("Reclaim worker {} is gone, dropping in place", self.name);
            drop(value);
        }
    }

    /// Values waiting for the worker.
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Values destroyed so far.
    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Acquire)
    }

    fn run(receiver: Receiver<T>, reclaimed: Arc<AtomicU64>) {
        for value in receiver.iter() {
            drop(value);
            let count = reclaimed.fetch_add(1, Ordering::AcqRel) + 1;
            if count % 4096 == 0 {
                trace!("Reclaimed {count} values, {} queued", receiver.len());
            }
        }
    }
}

impl<T: Send + 'static> Clone for ReclaimQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
            reclaimed: self.reclaimed.clone(),
        }
    }
}

impl<T: Send + 'static> Debug for ReclaimQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclaimQueue")
            .field("name", &self.name)
            .field("pending", &self.len())
            .field("reclaimed", &self.reclaimed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct Tracked {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(self.id);
        }
    }

    fn wait_until(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn pushed_values_should_be_destroyed_once_in_push_order() {
        let queue = ReclaimQueue::new("fifo").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..1000 {
            queue.push(Tracked {
                id,
                log: log.clone(),
            });
        }

        wait_until(|| queue.reclaimed() == 1000);
        let destroyed = log.lock().unwrap().clone();
        assert_eq!(destroyed, (0..1000).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn values_pushed_by_a_slow_producer_should_all_be_destroyed() {
        let queue = ReclaimQueue::new("slow").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..20 {
            queue.push(Tracked {
                id,
                log: log.clone(),
            });
            thread::sleep(Duration::from_millis(2));
        }

        wait_until(|| queue.reclaimed() == 20);
        assert_eq!(*log.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn push_should_return_while_the_worker_is_busy() {
        struct SlowDrop;
        impl Drop for SlowDrop {
            fn drop(&mut self) {
                thread::sleep(Duration::from_millis(50));
            }
        }

        let queue = ReclaimQueue::new("busy").unwrap();
        queue.push(SlowDrop);
        let started = Instant::now();
        for _ in 0..10 {
            queue.push(SlowDrop);
        }
        assert!(started.elapsed() < Duration::from_millis(50));
        wait_until(|| queue.reclaimed() == 11);
    }

    #[test]
    fn clones_should_feed_the_same_worker() {
        let queue = ReclaimQueue::new("shared").unwrap();
        let other = queue.clone();
        queue.push(vec![0u8; 16]);
        other.push(vec![0u8; 16]);
        wait_until(|| queue.reclaimed() == 2);
        assert_eq!(other.reclaimed(), 2);
    }

    #[test]
    fn values_queued_before_the_last_handle_drops_should_still_be_destroyed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = ReclaimQueue::new("dropped").unwrap();
        for id in 0..100 {
            queue.push(Tracked {
                id,
                log: log.clone(),
            });
        }
        drop(queue);

        wait_until(|| log.lock().unwrap().len() == 100);
        assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }
}
