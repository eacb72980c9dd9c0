//! Tokio adapter for `tenq-core`.
//!
//! This crate provides async wrappers around any core queue, including:
//! - `AsyncQueue` for put/next operations and an awaitable `recv`
//! - `AsyncWorkerReceiver` for dedicated receive-worker mode, usable as a `Stream`

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use futures_core::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

pub use tenq_core::{
    DequeueResult, FairQueue, FifoQueue, Message, PutError, Queue, QueueConfig, QueueStats,
    TenantKey,
};

const WORKER_RECV_TIMEOUT: Duration = Duration::from_millis(25);
const WORKER_FULL_BACKOFF: Duration = Duration::from_millis(1);
// Upper bound on how late `recv` notices puts made on the core queue directly.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Async wrapper around a shared [`Queue`].
///
/// Clones share the core queue and the wakeup used by [`AsyncQueue::recv`].
pub struct AsyncQueue<T> {
    inner: Arc<dyn Queue<T>>,
    notify: Arc<Notify>,
}

impl<T> Clone for AsyncQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T: Send + 'static> AsyncQueue<T> {
    /// Wraps an already shared queue.
    pub fn new(inner: Arc<dyn Queue<T>>) -> Self {
        Self {
            inner,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Round-robin queue with `buffer_capacity` slots per tenant.
    pub fn fair(config: QueueConfig) -> Self {
        Self::new(Arc::new(FairQueue::new(config)))
    }

    /// Shared FIFO queue with `buffer_capacity` slots overall.
    pub fn fifo(config: QueueConfig) -> Self {
        Self::new(Arc::new(FifoQueue::new(config)))
    }

    /// Returns the shared core queue.
    pub fn inner(&self) -> &Arc<dyn Queue<T>> {
        &self.inner
    }

    /// Non-blocking put. Wakes one pending [`AsyncQueue::recv`] on success.
    pub fn put(&self, tenant: TenantKey, payload: T) -> Result<(), PutError> {
        self.inner.put(tenant, payload)?;
        self.notify.notify_one();
        Ok(())
    }

    /// Calls the core `next`. Only use this on a fair queue from async code;
    /// the FIFO queue's `next` blocks the calling thread.
    pub fn next(&self) -> DequeueResult<T> {
        self.inner.next()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.stats()
    }

    pub fn close(&self) {
        self.inner.close();
        self.notify.notify_waiters();
    }

    /// Waits for the next message without holding a thread.
    ///
    /// Returns `None` once the queue is closed and drained. Cancel safe: a
    /// message is only taken from the queue when this future completes with
    /// it, so dropping the future (e.g. on a timeout) leaves it queued.
    pub async fn recv(&self) -> Option<Message<T>> {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            // Register before checking so a put between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            match self.inner.try_next() {
                DequeueResult::Message(message) => return Some(message),
                DequeueResult::Closed => return None,
                DequeueResult::Empty => {}
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(RECV_POLL_INTERVAL) => {}
            }
        }
    }

    /// Returns a receiver powered by a dedicated receive worker thread.
    pub fn receiver_with_worker(&self, buffer: usize) -> AsyncWorkerReceiver<T> {
        AsyncWorkerReceiver::new(self.clone(), buffer)
    }
}

struct WorkerThreadHandle {
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WorkerThreadHandle {
    fn new(shutdown: Arc<AtomicBool>, handle: thread::JoinHandle<()>) -> Self {
        Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }
}

impl Drop for WorkerThreadHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Receiver/stream adapter backed by a dedicated receive worker thread.
///
/// The worker only takes a message from the queue once it holds a free
/// channel slot, so at most `buffer` messages sit outside the queue at any
/// time. Messages already in the channel are lost when the receiver is
/// dropped; everything still in the queue stays there.
pub struct AsyncWorkerReceiver<T> {
    rx: mpsc::Receiver<Message<T>>,
    _worker: WorkerThreadHandle,
}

impl<T: Send + 'static> AsyncWorkerReceiver<T> {
    /// Creates a new worker-backed receiver.
    pub fn new(queue: AsyncQueue<T>, buffer: usize) -> Self {
        let buffer = buffer.max(1);
        let (tx, rx) = mpsc::channel(buffer);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = Arc::clone(&shutdown);
        let core = Arc::clone(queue.inner());

        let handle = thread::spawn(move || {
            while !worker_shutdown.load(Ordering::Acquire) {
                let permit = match tx.try_reserve() {
                    Ok(permit) => permit,
                    Err(TrySendError::Full(())) => {
                        thread::sleep(WORKER_FULL_BACKOFF);
                        continue;
                    }
                    Err(TrySendError::Closed(())) => break,
                };
                match core.recv_timeout(WORKER_RECV_TIMEOUT) {
                    DequeueResult::Message(message) => permit.send(message),
                    DequeueResult::Closed => break,
                    DequeueResult::Empty => {}
                }
            }
            tracing::debug!("receive worker stopped");
        });

        Self {
            rx,
            _worker: WorkerThreadHandle::new(shutdown, handle),
        }
    }

    /// Waits for the next message, returning `None` once the worker stops.
    pub async fn recv(&mut self) -> Option<Message<T>> {
        self.rx.recv().await
    }
}

impl<T> Drop for AsyncWorkerReceiver<T> {
    fn drop(&mut self) {
        self.rx.close();
    }
}

impl<T> Stream for AsyncWorkerReceiver<T> {
    type Item = Message<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Instant;

    fn key(name: &str) -> TenantKey {
        TenantKey::from(name)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_recv_receives_items() {
        let queue = AsyncQueue::fair(QueueConfig::new(8));
        queue.put(key("a"), 7u64).expect("put");

        let message = queue.recv().await.expect("message");
        assert_eq!(message.tenant, key("a"));
        assert_eq!(message.payload, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_recv_waits_for_late_put() {
        let queue = AsyncQueue::fifo(QueueConfig::new(8));
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.put(key("late"), 3u64).expect("put");
        });

        let message = tokio::time::timeout(Duration::from_secs(1), queue.recv())
            .await
            .expect("recv timed out")
            .expect("message");
        assert_eq!(message.payload, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_recv_returns_none_after_close() {
        let queue = AsyncQueue::<u64>::fair(QueueConfig::new(8));
        queue.close();
        assert!(queue.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_receiver_observes_round_robin_order() {
        let queue = AsyncQueue::fair(QueueConfig::new(8));
        queue.put(key("a"), 1u64).expect("put");
        queue.put(key("a"), 2).expect("put");
        queue.put(key("b"), 3).expect("put");
        queue.put(key("b"), 4).expect("put");

        let mut receiver = queue.receiver_with_worker(16);
        let mut observed = Vec::new();
        for _ in 0..4 {
            let message = tokio::time::timeout(Duration::from_secs(1), receiver.recv())
                .await
                .expect("worker recv timed out")
                .expect("expected message");
            observed.push((message.tenant.to_string(), message.payload));
        }

        assert_eq!(
            observed,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("b".to_string(), 4),
            ]
        );
        queue.close();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_stream_ends_when_queue_closes() {
        let queue = AsyncQueue::fair(QueueConfig::new(8));
        queue.put(key("a"), 1u64).expect("put");
        queue.close();

        let receiver = queue.receiver_with_worker(4);
        let items: Vec<_> = tokio::time::timeout(Duration::from_secs(1), receiver.collect::<Vec<_>>())
            .await
            .expect("stream did not end");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_receiver_drop_stops_worker() {
        let queue = AsyncQueue::<u64>::fair(QueueConfig::new(8));

        let start = Instant::now();
        {
            let _receiver = queue.receiver_with_worker(8);
        }
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "worker drop should join promptly"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn put_rejection_and_stats_pass_through() {
        let queue = AsyncQueue::fair(QueueConfig::new(1));
        queue.put(key("a"), 1u64).expect("put");
        assert_eq!(queue.put(key("a"), 2), Err(PutError::BufferFull(key("a"))));
        assert!(!queue.is_empty());

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.tenants, 1);

        let message = queue.next().into_message().expect("message");
        assert_eq!(message.payload, 1);
        assert!(queue.is_empty());
        assert!(matches!(queue.next(), DequeueResult::Empty));

        queue.close();
        assert_eq!(queue.put(key("a"), 3), Err(PutError::Closed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_recv_leaves_later_message_queued() {
        let queues = [
            AsyncQueue::fair(QueueConfig::new(8)),
            AsyncQueue::fifo(QueueConfig::new(8)),
        ];

        for queue in queues {
            let waited = tokio::time::timeout(Duration::from_millis(20), queue.recv()).await;
            assert!(waited.is_err(), "nothing was queued yet");

            queue.put(key("a"), 42u64).expect("put");
            tokio::time::sleep(Duration::from_millis(50)).await;

            assert!(!queue.is_empty());
            assert_eq!(queue.stats().dequeued, 0);
            let message = queue.inner().try_next().into_message().expect("message");
            assert_eq!(message.payload, 42);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_recv_wakes_on_close() {
        let queue = AsyncQueue::<u64>::fair(QueueConfig::new(8));
        let closer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let received = tokio::time::timeout(Duration::from_secs(1), queue.recv())
            .await
            .expect("recv did not observe close");
        assert!(received.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_recv_sees_puts_made_on_the_core_queue() {
        let queue = AsyncQueue::fair(QueueConfig::new(8));
        let core = Arc::clone(queue.inner());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            core.put(key("direct"), 9u64).expect("put");
        });

        let message = tokio::time::timeout(Duration::from_secs(1), queue.recv())
            .await
            .expect("recv timed out")
            .expect("message");
        assert_eq!(message.tenant, key("direct"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_worker_receiver_only_loses_its_channel() {
        let queue = AsyncQueue::fair(QueueConfig::new(8));
        for payload in 1..=4u64 {
            queue.put(key("a"), payload).expect("put");
        }

        {
            let _receiver = queue.receiver_with_worker(1);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let stats = queue.stats();
        assert_eq!(stats.dequeued, 1);
        assert_eq!(stats.pending, 3);
        let message = queue.next().into_message().expect("message");
        assert_eq!(message.payload, 2);
    }
}
