use lbroker_common::protocol::error::{BrokerError, Result};
use lbroker_common::PeerIdentity;
use std::collections::VecDeque;

/// FIFO of idle workers, bounded by the worker-pool size.
///
/// The least recently available worker is always dispatched next. A worker
/// appears at most once; it leaves the queue when it is handed a request and
/// comes back only with its next READY.
#[derive(Debug)]
pub struct WorkerQueue {
    workers: VecDeque<PeerIdentity>,
    capacity: usize,
}

impl WorkerQueue {
    /// Create an empty queue holding at most `capacity` workers
    pub fn new(capacity: usize) -> Self {
        Self {
            workers: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a worker to the back of the queue
    ///
    /// # Errors
    ///
    /// - `CapacityExceeded` if the queue is full
    /// - `AlreadyQueued` if the worker is already waiting
    pub fn enqueue(&mut self, identity: PeerIdentity) -> Result<()> {
        if self.workers.len() >= self.capacity {
            return Err(BrokerError::CapacityExceeded(self.capacity));
        }
        if self.workers.contains(&identity) {
            return Err(BrokerError::AlreadyQueued(identity));
        }
        self.workers.push_back(identity);
        Ok(())
    }

    /// Remove and return the worker at the front
    ///
    /// The dispatch loop only reads the frontend while the queue is non-empty,
    /// so `QueueEmpty` here means that invariant was broken.
    pub fn dequeue_front(&mut self) -> Result<PeerIdentity> {
        self.workers.pop_front().ok_or(BrokerError::QueueEmpty)
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Get the number of idle workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
