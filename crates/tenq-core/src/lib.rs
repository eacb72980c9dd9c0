//! Multi-tenant message queues.
//!
//! Two policies sit behind the [`Queue`] trait:
//! - [`FairQueue`]: one bounded buffer per tenant, served round-robin one
//!   message per tenant per rotation. Never blocks.
//! - [`FifoQueue`]: one shared bounded buffer in arrival order. `next` blocks
//!   until data arrives.
//!
//! Both reject a `put` with [`PutError::BufferFull`] instead of waiting or
//! evicting. The core is runtime agnostic; the Tokio adapter lives in
//! `tenq-async`.

mod api;
mod fair;
mod fifo;
mod generator;
mod prometheus;
mod state;

pub use api::{
    ConfigError, DequeueResult, Message, PutError, Queue, QueueConfig, QueueStats, TenantKey,
};
pub use fair::FairQueue;
pub use fifo::FifoQueue;
pub use generator::PayloadGenerator;
pub use prometheus::render_stats;
