// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("serial executor is closed")]
    Closed,
}

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A single-consumer FIFO that runs submitted async work strictly in
/// submission order (§4.3). Used by backends that own a non-reentrant
/// resource — here, the managed backend's subprocess-supervision sequence
/// (check exit status, respawn, delegate) — so concurrent callers never
/// interleave steps against it.
pub struct SerialExecutor {
    tx: mpsc::UnboundedSender<Job>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    cancelled: Arc<Mutex<HashSet<u64>>>,
}

/// A handle to a submitted job. Dropping it without calling `wait` simply
/// abandons interest in the result; the job still runs unless `cancel` is
/// called first and the consumer has not yet picked it up.
pub struct JobHandle<T> {
    id: u64,
    cancelled: Arc<Mutex<HashSet<u64>>>,
    rx: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Removes the task if the consumer has not yet started it; has no
    /// effect once the job is running or finished.
    pub fn cancel(&self) {
        self.cancelled.lock().expect("executor cancel-set lock poisoned").insert(self.id);
    }

    pub async fn wait(self) -> Result<T, ExecutorError> {
        self.rx.await.map_err(|_| ExecutorError::Closed)
    }
}

impl SerialExecutor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(Self::drain(rx));
        SerialExecutor {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
            cancelled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            job.await;
        }
    }

    /// Enqueue `f`, returning a handle that can be cancelled before the
    /// consumer picks it up.
    pub fn submit<F, Fut, T>(&self, f: F) -> Result<JobHandle<T>, ExecutorError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cancelled = self.cancelled.clone();
        let (result_tx, result_rx) = oneshot::channel::<T>();

        let job: Job = Box::pin(async move {
            if cancelled.lock().expect("executor cancel-set lock poisoned").remove(&id) {
                return;
            }
            let result = f().await;
            let _ = result_tx.send(result);
        });

        self.tx.send(job).map_err(|_| ExecutorError::Closed)?;
        Ok(JobHandle { id, cancelled: self.cancelled.clone(), rx: result_rx })
    }

    /// Submit `f` and await its result — the common case when the caller
    /// has no need to cancel.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, ExecutorError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(f)?.wait().await
    }

    /// Submissions after `close()` fail with `ExecutorError::Closed`.
    /// Already-queued work still runs to completion.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Default for SerialExecutor {
    fn default() -> Self {
        Self::new()
    }
}
