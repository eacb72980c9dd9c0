use std::fmt;
use std::time::Duration;

/// Identity of a message owner; the unit of fairness isolation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantKey(String);

impl From<&str> for TenantKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TenantKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl TenantKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payload tagged with the tenant that produced it.
///
/// Queues take messages by value and give them back by value, so nothing
/// outside the queue can observe a buffered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<T = u64> {
    pub tenant: TenantKey,
    pub payload: T,
}

impl<T> Message<T> {
    pub fn new(tenant: impl Into<TenantKey>, payload: T) -> Self {
        Self {
            tenant: tenant.into(),
            payload,
        }
    }

    pub fn into_parts(self) -> (TenantKey, T) {
        (self.tenant, self.payload)
    }
}

/// Queue construction parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Capacity of each tenant buffer (fair) or of the shared buffer (fifo).
    pub buffer_capacity: usize,
}

impl QueueConfig {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(buffer_capacity: usize) -> Self {
        Self { buffer_capacity }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,
}

/// Reason a `put` did not admit its message. The message is dropped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PutError {
    /// The target buffer was at capacity when the call was made.
    #[error("buffer full for tenant `{0}`")]
    BufferFull(TenantKey),
    /// The queue was closed and admits no more work.
    #[error("queue closed")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DequeueResult<T> {
    /// A message selected by the queue's policy.
    Message(Message<T>),
    /// Nothing is pending right now.
    Empty,
    /// The queue was closed and every pending message has been delivered.
    Closed,
}

impl<T> DequeueResult<T> {
    pub fn into_message(self) -> Option<Message<T>> {
        match self {
            DequeueResult::Message(message) => Some(message),
            DequeueResult::Empty | DequeueResult::Closed => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Messages admitted by `put`.
    pub enqueued: u64,
    /// Messages handed out by `next`/`recv`.
    pub dequeued: u64,
    /// `put` calls refused with `BufferFull`.
    pub rejected: u64,
    /// Messages currently buffered.
    pub pending: u64,
    /// Tenants ever seen (always 0 for the FIFO queue).
    pub tenants: u64,
}

/// Scheduling policy shared by every queue.
///
/// `next` follows the policy's own blocking contract: it never waits on the
/// fair queue and waits for data on the FIFO queue. `recv` always waits.
pub trait Queue<T>: Send + Sync {
    /// Admits a message without blocking, or reports why it was dropped.
    fn put(&self, tenant: TenantKey, payload: T) -> Result<(), PutError>;

    /// Selects one message according to the policy.
    fn next(&self) -> DequeueResult<T>;

    /// Selects one message without ever waiting; `Empty` when nothing is
    /// pending.
    fn try_next(&self) -> DequeueResult<T>;

    /// Whether no message is buffered at the moment of the call.
    fn is_empty(&self) -> bool;

    /// Waits until a message is available or the queue is closed and drained.
    fn recv(&self) -> DequeueResult<T>;

    /// Like [`Queue::recv`] but gives up with `Empty` after `timeout`.
    fn recv_timeout(&self, timeout: Duration) -> DequeueResult<T>;

    /// Stops admitting messages and wakes blocked receivers. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;

    fn stats(&self) -> QueueStats;
}
