use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::api::{DequeueResult, Message, PutError, Queue, QueueConfig, QueueStats, TenantKey};
use crate::state::{BoundedBuffer, StatsCounters};

struct FifoState<T> {
    buffer: BoundedBuffer<T>,
    closed: bool,
}

/// Single shared bounded buffer in arrival order.
///
/// No tenant isolation: one tenant filling the buffer makes every other
/// tenant's `put` fail until a consumer catches up. `next` blocks until a
/// message arrives or the queue is closed.
pub struct FifoQueue<T> {
    config: QueueConfig,
    state: Mutex<FifoState<T>>,
    available: Condvar,
    stats: StatsCounters,
}

impl<T> FifoQueue<T> {
    /// A `buffer_capacity` of 0 is raised to 1; call
    /// [`QueueConfig::validate`] first to reject it instead.
    pub fn new(config: QueueConfig) -> Self {
        let capacity = config.buffer_capacity.max(1);
        Self {
            config: QueueConfig::new(capacity),
            state: Mutex::new(FifoState {
                buffer: BoundedBuffer::new(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            stats: StatsCounters::new(),
        }
    }

    pub fn with_capacity(buffer_capacity: usize) -> Self {
        Self::new(QueueConfig::new(buffer_capacity))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn put(&self, tenant: TenantKey, payload: T) -> Result<(), PutError> {
        let pushed = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PutError::Closed);
            }
            state.buffer.try_push(Message { tenant, payload })
        };

        match pushed {
            Ok(()) => {
                StatsCounters::incr(&self.stats.enqueued);
                self.available.notify_one();
                Ok(())
            }
            Err(rejected) => {
                StatsCounters::incr(&self.stats.rejected);
                tracing::trace!(tenant = %rejected.tenant, "shared buffer full, message dropped");
                Err(PutError::BufferFull(rejected.tenant))
            }
        }
    }

    /// Blocks until a message is available. Returns `Closed` only after
    /// [`FifoQueue::close`] once the buffer has drained.
    pub fn next(&self) -> DequeueResult<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(message) = state.buffer.try_pop() {
                StatsCounters::incr(&self.stats.dequeued);
                return DequeueResult::Message(message);
            }
            if state.closed {
                return DequeueResult::Closed;
            }
            self.available.wait(&mut state);
        }
    }

    /// Non-blocking pop.
    pub fn try_next(&self) -> DequeueResult<T> {
        let mut state = self.state.lock();
        match state.buffer.try_pop() {
            Some(message) => {
                StatsCounters::incr(&self.stats.dequeued);
                DequeueResult::Message(message)
            }
            None if state.closed => DequeueResult::Closed,
            None => DequeueResult::Empty,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> DequeueResult<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(message) = state.buffer.try_pop() {
                StatsCounters::incr(&self.stats.dequeued);
                return DequeueResult::Message(message);
            }
            if state.closed {
                return DequeueResult::Closed;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return match state.buffer.try_pop() {
                    Some(message) => {
                        StatsCounters::incr(&self.stats.dequeued);
                        DequeueResult::Message(message)
                    }
                    None => DequeueResult::Empty,
                };
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let pending = state.buffer.len();
        drop(state);
        tracing::debug!(pending, "fifo queue closed");
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: StatsCounters::load(&self.stats.enqueued),
            dequeued: StatsCounters::load(&self.stats.dequeued),
            rejected: StatsCounters::load(&self.stats.rejected),
            pending: self.len() as u64,
            tenants: 0,
        }
    }
}

impl<T: Send> Queue<T> for FifoQueue<T> {
    fn put(&self, tenant: TenantKey, payload: T) -> Result<(), PutError> {
        FifoQueue::put(self, tenant, payload)
    }

    fn next(&self) -> DequeueResult<T> {
        FifoQueue::next(self)
    }

    fn try_next(&self) -> DequeueResult<T> {
        FifoQueue::try_next(self)
    }

    fn is_empty(&self) -> bool {
        FifoQueue::is_empty(self)
    }

    fn recv(&self) -> DequeueResult<T> {
        FifoQueue::next(self)
    }

    fn recv_timeout(&self, timeout: Duration) -> DequeueResult<T> {
        FifoQueue::recv_timeout(self, timeout)
    }

    fn close(&self) {
        FifoQueue::close(self)
    }

    fn is_closed(&self) -> bool {
        FifoQueue::is_closed(self)
    }

    fn stats(&self) -> QueueStats {
        FifoQueue::stats(self)
    }
}
