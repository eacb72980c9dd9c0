use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::api::{DequeueResult, Message, PutError, Queue, QueueConfig, QueueStats, TenantKey};
use crate::state::{Ring, StatsCounters};

struct FairState<T> {
    ring: Ring<T>,
    closed: bool,
}

/// Per-tenant bounded buffers served round-robin.
///
/// Every tenant gets its own buffer of `buffer_capacity` messages, created on
/// its first `put` and appended to the ring. `next` takes at most one message
/// per ring position, so a tenant that fills its buffer cannot delay another
/// tenant by more than one rotation.
///
/// Registration, enqueue and the `next` scan share one lock per queue.
pub struct FairQueue<T> {
    config: QueueConfig,
    state: Mutex<FairState<T>>,
    work: Condvar,
    stats: StatsCounters,
}

impl<T> FairQueue<T> {
    /// A `buffer_capacity` of 0 is raised to 1; call
    /// [`QueueConfig::validate`] first to reject it instead.
    pub fn new(config: QueueConfig) -> Self {
        let capacity = config.buffer_capacity.max(1);
        Self {
            config: QueueConfig::new(capacity),
            state: Mutex::new(FairState {
                ring: Ring::new(capacity),
                closed: false,
            }),
            work: Condvar::new(),
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
        let mut state = self.state.lock();
        if state.closed {
            return Err(PutError::Closed);
        }

        let (slot, registered) = state.ring.slot_for(&tenant);
        if registered {
            tracing::debug!(tenant = %slot.tenant, "tenant registered");
        }

        let pushed = slot.buffer.try_push(Message { tenant, payload });
        drop(state);

        match pushed {
            Ok(()) => {
                StatsCounters::incr(&self.stats.enqueued);
                self.work.notify_one();
                Ok(())
            }
            Err(rejected) => {
                StatsCounters::incr(&self.stats.rejected);
                tracing::trace!(tenant = %rejected.tenant, "buffer full, message dropped");
                Err(PutError::BufferFull(rejected.tenant))
            }
        }
    }

    /// Returns the next message in round-robin order without blocking.
    pub fn next(&self) -> DequeueResult<T> {
        let mut state = self.state.lock();
        self.next_locked(&mut state)
    }

    fn next_locked(&self, state: &mut MutexGuard<'_, FairState<T>>) -> DequeueResult<T> {
        match state.ring.pop_next() {
            Some(message) => {
                StatsCounters::incr(&self.stats.dequeued);
                DequeueResult::Message(message)
            }
            None if state.closed => DequeueResult::Closed,
            None => DequeueResult::Empty,
        }
    }

    pub fn recv(&self) -> DequeueResult<T> {
        let mut state = self.state.lock();
        loop {
            match self.next_locked(&mut state) {
                DequeueResult::Empty => self.work.wait(&mut state),
                other => return other,
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> DequeueResult<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match self.next_locked(&mut state) {
                DequeueResult::Empty => {
                    if self.work.wait_until(&mut state, deadline).timed_out() {
                        return self.next_locked(&mut state);
                    }
                }
                other => return other,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.all_empty()
    }

    /// Tenants in ring order.
    pub fn tenants(&self) -> Vec<TenantKey> {
        self.state.lock().ring.tenants().cloned().collect()
    }

    /// Messages currently buffered for `tenant`; 0 for unknown tenants.
    pub fn pending_for(&self, tenant: &TenantKey) -> usize {
        self.state
            .lock()
            .ring
            .get(tenant)
            .map(|slot| slot.buffer.len())
            .unwrap_or(0)
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let pending = state.ring.pending();
        drop(state);
        tracing::debug!(pending, "fair queue closed");
        self.work.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> QueueStats {
        let (pending, tenants) = {
            let state = self.state.lock();
            (state.ring.pending() as u64, state.ring.len() as u64)
        };
        QueueStats {
            enqueued: StatsCounters::load(&self.stats.enqueued),
            dequeued: StatsCounters::load(&self.stats.dequeued),
            rejected: StatsCounters::load(&self.stats.rejected),
            pending,
            tenants,
        }
    }
}

impl<T: Send> Queue<T> for FairQueue<T> {
    fn put(&self, tenant: TenantKey, payload: T) -> Result<(), PutError> {
        FairQueue::put(self, tenant, payload)
    }

    fn next(&self) -> DequeueResult<T> {
        FairQueue::next(self)
    }

    fn try_next(&self) -> DequeueResult<T> {
        FairQueue::next(self)
    }

    fn is_empty(&self) -> bool {
        FairQueue::is_empty(self)
    }

    fn recv(&self) -> DequeueResult<T> {
        FairQueue::recv(self)
    }

    fn recv_timeout(&self, timeout: Duration) -> DequeueResult<T> {
        FairQueue::recv_timeout(self, timeout)
    }

    fn close(&self) {
        FairQueue::close(self)
    }

    fn is_closed(&self) -> bool {
        FairQueue::is_closed(self)
    }

    fn stats(&self) -> QueueStats {
        FairQueue::stats(self)
    }
}
