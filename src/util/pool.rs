//! Fixed-size worker pool fed by an unbounded task queue.
//!
//! Workers report task failures and their own death separately. The first of
//! either halts the pool: later submissions are refused and queued tasks are
//! drained without being started.

use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::FutureExt;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::error::PoolError;

type TaskQueue<T> = Arc<Mutex<mpsc::UnboundedReceiver<T>>>;

pub struct WorkerPool<T, E> {
    submitter: Submitter<T>,
    receiver: TaskQueue<T>,
    workers: Vec<JoinHandle<WorkerReport<E>>>,
}

/// Queues tasks into a [`WorkerPool`] from any thread.
pub struct Submitter<T> {
    queue: mpsc::UnboundedSender<T>,
    halted: Arc<AtomicBool>,
}

impl<T> Clone for Submitter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            halted: Arc::clone(&self.halted),
        }
    }
}

impl<T> Submitter<T> {
    /// Queues a task without waiting for a worker.
    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        if self.is_halted() {
            return Err(PoolError::Halted);
        }
        self.queue.send(task).map_err(|_| PoolError::Halted)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

/// What the pool did once all workers have stopped.
#[derive(Debug)]
pub struct PoolReport<E> {
    /// Tasks that ran to completion.
    pub completed: usize,
    /// Tasks queued but never started because the pool halted.
    pub skipped: usize,
    /// Errors returned by tasks.
    pub failures: Vec<E>,
    /// Tasks that panicked, killing their worker.
    pub crashed: usize,
    /// Set when a worker died; the pool could no longer be trusted.
    pub broken: Option<String>,
}

impl<E> PoolReport<E> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.broken.is_none()
    }
}

struct WorkerReport<E> {
    completed: usize,
    skipped: usize,
    failures: Vec<E>,
    panic: Option<String>,
}

impl<E> Default for WorkerReport<E> {
    fn default() -> Self {
        Self {
            completed: 0,
            skipped: 0,
            failures: Vec::new(),
            panic: None,
        }
    }
}

impl<T, E> WorkerPool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawns `size` workers on the current tokio runtime, each running `job`
    /// on one task at a time.
    pub fn start<F, Fut>(size: usize, job: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver: TaskQueue<T> = Arc::new(Mutex::new(receiver));
        let job = Arc::new(job);
        let halted = Arc::new(AtomicBool::new(false));
        let workers = (0..size.max(1))
            .map(|id| {
                tokio::spawn(work(
                    id,
                    Arc::clone(&receiver),
                    Arc::clone(&job),
                    Arc::clone(&halted),
                ))
            })
            .collect();
        tracing::debug!("Started worker pool with {} workers", size.max(1));
        Self {
            submitter: Submitter {
                queue: sender,
                halted,
            },
            receiver,
            workers,
        }
    }

    /// Queues a task without waiting for a worker.
    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        self.submitter.submit(task)
    }

    pub fn is_halted(&self) -> bool {
        self.submitter.is_halted()
    }

    /// A handle that queues into this pool, e.g. from a blocking thread.
    /// [`shutdown`](Self::shutdown) only returns once every handle is dropped
    /// or the workers are gone.
    pub fn submitter(&self) -> Submitter<T> {
        self.submitter.clone()
    }

    /// Closes the queue and waits until every worker has stopped.
    ///
    /// Tasks left in the queue because every worker died are counted as
    /// skipped.
    pub async fn shutdown(self) -> PoolReport<E> {
        let Self {
            submitter,
            receiver,
            workers,
        } = self;
        drop(submitter);

        let mut report = PoolReport {
            completed: 0,
            skipped: 0,
            failures: Vec::new(),
            crashed: 0,
            broken: None,
        };
        for (id, joined) in futures::future::join_all(workers)
            .await
            .into_iter()
            .enumerate()
        {
            match joined {
                Ok(worker) => {
                    report.completed += worker.completed;
                    report.skipped += worker.skipped;
                    report.failures.extend(worker.failures);
                    if let Some(panic) = worker.panic {
                        report.crashed += 1;
                        report.broken.get_or_insert(format!("worker {id} died: {panic}"));
                    }
                }
                Err(err) => {
                    tracing::error!("Worker {} could not be joined: {}", id, err);
                    report.broken.get_or_insert(format!("worker {id} lost: {err}"));
                }
            }
        }

        let mut queue = receiver.lock().await;
        queue.close();
        while queue.try_recv().is_ok() {
            report.skipped += 1;
        }
        report
    }
}

async fn work<T, E, F, Fut>(
    id: usize,
    queue: TaskQueue<T>,
    job: Arc<F>,
    halted: Arc<AtomicBool>,
) -> WorkerReport<E>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    let mut report = WorkerReport::default();
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        if halted.load(Ordering::Acquire) {
            report.skipped += 1;
            continue;
        }
        match AssertUnwindSafe(job(task)).catch_unwind().await {
            Ok(Ok(())) => report.completed += 1,
            Ok(Err(err)) => {
                halted.store(true, Ordering::Release);
                report.failures.push(err);
            }
            Err(payload) => {
                halted.store(true, Ordering::Release);
                let message = panic_message(payload.as_ref());
                tracing::error!("Worker {} died: {}", id, message);
                report.panic = Some(message);
                // A dead worker takes no more tasks; the others drain the queue.
                break;
            }
        }
    }
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
