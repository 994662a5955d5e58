use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::DEFAULT_WORKER_COUNT;
use crate::error::{ProcessError, WorkerError};
use crate::sanitize::{hash_path, redact_path};
use crate::worker::executor::JobExecutor;
use crate::worker::job::{Job, JobDescriptor, JobOutcome};
use crate::worker::panic_message;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub worker_count: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            thread_name: "media-worker".to_string(),
        }
    }
}

/// Pool lifecycle. Moves forward only; `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Uninitialized,
    Running,
    Draining,
    Terminated,
}

/// Point-in-time view of the pool. `None` means the value could not be
/// read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub state: PoolState,
    pub is_shutting_down: bool,
    pub max_workers: usize,
    pub live_workers: Option<usize>,
    pub active_jobs: Option<usize>,
    pub pending_jobs: Option<usize>,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
}

#[derive(Default)]
struct Counters {
    live_workers: AtomicUsize,
    active_jobs: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

struct Inner {
    state: PoolState,
    sender: Option<Sender<Job>>,
    /// Kept only to report queue depth; workers hold their own clones.
    receiver: Option<Receiver<Job>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    terminated: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Worker pool lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn mark_terminated(&self) {
        let mut inner = self.lock();
        inner.state = PoolState::Terminated;
        inner.receiver = None;
        self.terminated.notify_all();
    }
}

/// Fixed-size pool of worker threads fed by an unbounded queue.
///
/// Threads are spawned on the first successful [`WorkerPool::submit`].
/// [`WorkerPool::shutdown`] closes the queue; workers finish everything
/// already queued and then exit.
pub struct WorkerPool {
    config: PoolConfig,
    executor: Arc<dyn JobExecutor>,
    shared: Arc<Shared>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig, executor: Arc<dyn JobExecutor>) -> Result<Self, WorkerError> {
        if config.worker_count == 0 {
            return Err(WorkerError::Validation("worker_count must be > 0".to_string()));
        }
        Ok(Self {
            config,
            executor,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: PoolState::Uninitialized,
                    sender: None,
                    receiver: None,
                    workers: Vec::new(),
                }),
                terminated: Condvar::new(),
            }),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Validates and enqueues a job without waiting for it to run.
    pub fn submit(&self, descriptor: JobDescriptor) -> Result<(), WorkerError> {
        let job = descriptor.validate()?;

        let mut inner = self.shared.lock();
        let state = inner.state;
        match state {
            PoolState::Draining | PoolState::Terminated => {
                return Err(WorkerError::PoolUnavailable);
            }
            PoolState::Uninitialized => self.start(&mut inner)?,
            PoolState::Running => {}
        }

        let media_id = job.media_id;
        inner
            .sender
            .as_ref()
            .ok_or(WorkerError::PoolUnavailable)?
            .send(job)
            .map_err(|_| WorkerError::PoolUnavailable)?;

        debug!("Media job {} queued", media_id);
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        let (state, pending_jobs) = match self.shared.inner.lock() {
            Ok(inner) => (
                inner.state,
                Some(inner.receiver.as_ref().map_or(0, Receiver::len)),
            ),
            Err(poisoned) => (poisoned.into_inner().state, None),
        };

        PoolStatus {
            state,
            is_shutting_down: state == PoolState::Draining,
            max_workers: self.config.worker_count,
            live_workers: Some(self.counters.live_workers.load(Ordering::SeqCst)),
            active_jobs: Some(self.counters.active_jobs.load(Ordering::SeqCst)),
            pending_jobs,
            completed_jobs: self.counters.completed.load(Ordering::SeqCst),
            failed_jobs: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    pub fn state(&self) -> PoolState {
        self.shared.lock().state
    }

    /// Stops accepting jobs and drains the queue.
    ///
    /// With `wait` the call returns once every queued and running job has
    /// finished. Without it the drain continues on a background thread.
    /// Calling it again is harmless; `shutdown(true)` during a background
    /// drain waits for that drain.
    pub fn shutdown(&self, wait: bool) {
        let mut inner = self.shared.lock();
        let state = inner.state;
        match state {
            PoolState::Terminated => {}
            PoolState::Uninitialized => {
                inner.state = PoolState::Terminated;
                self.shared.terminated.notify_all();
                info!("Worker pool closed before any job was submitted");
            }
            PoolState::Draining => {
                if wait {
                    while inner.state != PoolState::Terminated {
                        inner = match self.shared.terminated.wait(inner) {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                    }
                }
            }
            PoolState::Running => {
                inner.state = PoolState::Draining;
                // Closing the channel lets workers exit once the queue is empty.
                inner.sender = None;
                let workers = mem::take(&mut inner.workers);
                let pending = inner.receiver.as_ref().map_or(0, Receiver::len);
                drop(inner);

                info!(
                    "Shutting down worker pool ({} jobs pending, wait={})",
                    pending, wait
                );

                if wait {
                    join_workers(workers);
                    self.shared.mark_terminated();
                    info!("All workers have stopped");
                } else {
                    self.drain_in_background(workers);
                }
            }
        }
    }

    fn drain_in_background(&self, workers: Vec<JoinHandle<()>>) {
        let shared = Arc::clone(&self.shared);
        let (handoff_tx, handoff_rx) = crossbeam_channel::bounded::<Vec<JoinHandle<()>>>(1);
        let spawned = thread::Builder::new()
            .name(format!("{}-reaper", self.config.thread_name))
            .spawn(move || {
                if let Ok(workers) = handoff_rx.recv() {
                    join_workers(workers);
                }
                shared.mark_terminated();
                info!("All workers have stopped");
            });

        match spawned {
            Ok(_) => {
                // The reaper only exits after it received the handles.
                let _ = handoff_tx.send(workers);
            }
            Err(e) => {
                warn!("Failed to spawn reaper thread ({}), draining inline", e);
                join_workers(workers);
                self.shared.mark_terminated();
            }
        }
    }

    fn start(&self, inner: &mut Inner) -> Result<(), WorkerError> {
        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(self.config.worker_count);

        for worker_id in 0..self.config.worker_count {
            let rx = receiver.clone();
            let executor = Arc::clone(&self.executor);
            let counters = Arc::clone(&self.counters);
            counters.live_workers.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name, worker_id))
                .spawn(move || run_worker(worker_id, rx, executor, counters));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    self.counters.live_workers.fetch_sub(1, Ordering::SeqCst);
                    error!("Failed to spawn worker {}: {}", worker_id, e);
                    // Disconnects the channel so already-started workers exit.
                    drop(sender);
                    join_workers(workers);
                    return Err(WorkerError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers", self.config.worker_count);

        inner.sender = Some(sender);
        inner.receiver = Some(receiver);
        inner.workers = workers;
        inner.state = PoolState::Running;
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let state = self.shared.lock().state;
        if matches!(state, PoolState::Running) {
            warn!(
                "Worker pool dropped without shutdown; {} workers left to drain detached",
                self.counters.live_workers.load(Ordering::SeqCst)
            );
        }
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) {
    for (i, worker) in workers.into_iter().enumerate() {
        if let Err(e) = worker.join() {
            error!("Worker {} panicked: {}", i, panic_message(e.as_ref()));
        } else {
            debug!("Worker {} finished", i);
        }
    }
}

fn run_worker(
    worker_id: usize,
    receiver: Receiver<Job>,
    executor: Arc<dyn JobExecutor>,
    counters: Arc<Counters>,
) {
    debug!("Worker {} started", worker_id);

    // recv fails only once every sender is gone and the queue is empty.
    while let Ok(job) = receiver.recv() {
        let span = tracing::info_span!(
            "media_job",
            worker_id,
            media_id = %job.media_id,
            file = %redact_path(&job.file_path),
            path_hash = %hash_path(&job.file_path)
        );
        let _guard = span.enter();

        counters.active_jobs.fetch_add(1, Ordering::SeqCst);
        let result = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&job)));
        counters.active_jobs.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(Ok(JobOutcome::Completed)) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
                info!("Media {} processed", job.media_id);
            }
            Ok(Ok(JobOutcome::Skipped)) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Ok(JobOutcome::Failed(reason))) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!("Media {} failed: {}", job.media_id, reason);
            }
            Ok(Err(ProcessError::RecordNotFound(id))) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!("Media record {} not found, job dropped", id);
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!("Media job {} failed: {}", job.media_id, e);
            }
            Err(payload) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    "Media job {} panicked: {}",
                    job.media_id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    counters.live_workers.fetch_sub(1, Ordering::SeqCst);
    debug!("Worker {} stopped", worker_id);
}
