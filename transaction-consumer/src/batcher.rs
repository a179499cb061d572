use std::mem;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::BatcherError;

/// Receives every batch the `Batcher` releases. A batch is handed over by
/// value, the batcher keeps no reference to it.
#[async_trait]
pub trait BatchFlusher<T: Send + 'static>: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn flush(&self, batch: Vec<T>) -> Result<(), Self::Error>;
}

/// Buffers items and hands them to a `BatchFlusher` once `capacity` items are
/// buffered, or once `timeout` has passed since the previous flush, whichever
/// comes first.
///
/// A single lock covers the buffer and the flush deadline, and it is held
/// while a flush is in flight. Concurrent `add` calls therefore wait for a
/// slow flusher, and items reach the flusher in the order they were added.
///
/// A failed flush drops its batch. If the failing flush was started by the
/// background timer, its error is returned from the next `add` or `close`.
pub struct Batcher<T: Send + 'static, F: BatchFlusher<T>> {
    inner: Arc<Inner<T, F>>,
}

impl<T: Send + 'static, F: BatchFlusher<T>> Clone for Batcher<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T: Send + 'static, F: BatchFlusher<T>> {
    state: Mutex<State<T, F::Error>>,
    capacity: usize,
    timeout: Duration,
    flusher: F,
    timer: CancellationToken,
}

struct State<T, E> {
    buffer: Vec<T>,
    deadline: Instant,
    pending_error: Option<E>,
    closed: bool,
}

impl<T: Send + 'static, F: BatchFlusher<T>> Batcher<T, F> {
    /// Must be called from within a Tokio runtime, the flush timer runs as a
    /// background task.
    pub fn new(
        capacity: usize,
        timeout: Duration,
        flusher: F,
    ) -> Result<Self, BatcherError<F::Error>> {
        if capacity == 0 {
            return Err(BatcherError::InvalidCapacity);
        }
        if timeout.is_zero() {
            return Err(BatcherError::InvalidTimeout);
        }

        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                buffer: Vec::with_capacity(capacity),
                deadline: Instant::now() + timeout,
                pending_error: None,
                closed: false,
            }),
            capacity,
            timeout,
            flusher,
            timer: CancellationToken::new(),
        });

        tokio::spawn(run_timer(Arc::downgrade(&inner), inner.timer.clone()));

        Ok(Self { inner })
    }

    /// Buffer one item. Reaching capacity flushes before returning, and the
    /// flush result is returned.
    pub async fn add(&self, item: T) -> Result<(), BatcherError<F::Error>> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(BatcherError::Closed);
        }
        if let Some(e) = state.pending_error.take() {
            return Err(BatcherError::Flush(e));
        }

        state.buffer.push(item);
        if state.buffer.len() >= self.inner.capacity {
            self.inner
                .flush_locked(&mut state)
                .await
                .map_err(BatcherError::Flush)?;
        }

        Ok(())
    }

    /// Stop the timer and flush whatever is buffered. Any later `add` fails
    /// with `BatcherError::Closed`, and closing again does nothing.
    pub async fn close(&self) -> Result<(), BatcherError<F::Error>> {
        self.inner.timer.cancel();

        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let pending = state.pending_error.take();
        let result = self.inner.flush_locked(&mut state).await;

        if let Some(e) = pending {
            return Err(BatcherError::Flush(e));
        }
        result.map_err(BatcherError::Flush)
    }

    /// Number of items currently waiting for a flush.
    pub async fn buffered(&self) -> usize {
        self.inner.state.lock().await.buffer.len()
    }
}

impl<T: Send + 'static, F: BatchFlusher<T>> Inner<T, F> {
    async fn flush_locked(&self, state: &mut State<T, F::Error>) -> Result<(), F::Error> {
        if state.buffer.is_empty() {
            state.deadline = Instant::now() + self.timeout;
            return Ok(());
        }

        let batch = mem::replace(&mut state.buffer, Vec::with_capacity(self.capacity));
        debug!(size = batch.len(), "flushing batch");
        let result = self.flusher.flush(batch).await;

        state.deadline = Instant::now() + self.timeout;
        result
    }
}

impl<T: Send + 'static, F: BatchFlusher<T>> Drop for Inner<T, F> {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}

async fn run_timer<T: Send + 'static, F: BatchFlusher<T>>(
    inner: Weak<Inner<T, F>>,
    stop: CancellationToken,
) {
    loop {
        let deadline = {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let state = inner.state.lock().await;
            state.deadline
        };

        tokio::select! {
            _ = stop.cancelled() => return,
            _ = sleep_until(deadline) => {}
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut state = inner.state.lock().await;
        if state.closed {
            return;
        }
        // Another flush moved the deadline while we slept
        if Instant::now() < state.deadline {
            continue;
        }

        if let Err(e) = inner.flush_locked(&mut state).await {
            error!(error = %e, "timed batch flush failed");
            if state.pending_error.is_none() {
                state.pending_error = Some(e);
            }
        }
    }
}
