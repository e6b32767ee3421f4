//! Dedicated background thread with a FIFO job queue.
//!
//! A [`Worker`] runs jobs one at a time, in submission order, on a single
//! thread it owns. The month page cache uses one worker per cache so that
//! pagination requests are serialized: a request is committed before the
//! next one starts.
//!
//! # Example
//!
//! ```
//! use lattice_calendar_core::worker::{Worker, WorkerConfig};
//!
//! let worker = Worker::new(WorkerConfig::with_name("pages")).unwrap();
//! let (tx, rx) = crossbeam_channel::bounded(1);
//! worker.send(move || tx.send(6 * 7).unwrap()).unwrap();
//! assert_eq!(rx.recv().unwrap(), 42);
//! worker.stop_and_join();
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::CalendarError;
use crate::logging::targets;

/// Default capacity for the worker's job queue.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Configuration for creating a [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name for the worker thread.
    pub name: String,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
    /// Capacity of the job queue.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "lattice-calendar-worker".to_string(),
            stack_size: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Create a configuration with the given thread name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

type Job = Box<dyn FnOnce() + Send>;

enum Message {
    Run(Job),
    Shutdown,
}

struct WorkerState {
    running: AtomicBool,
    pending_jobs: AtomicUsize,
}

/// A dedicated worker thread with its own job queue.
pub struct Worker {
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: Arc<WorkerState>,
    name: String,
}

impl Worker {
    /// Spawn a worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::WorkerSpawn`] if the OS refuses the thread.
    pub fn new(config: WorkerConfig) -> Result<Self, CalendarError> {
        let (sender, receiver) = bounded(config.queue_capacity);
        let state = Arc::new(WorkerState {
            running: AtomicBool::new(true),
            pending_jobs: AtomicUsize::new(0),
        });

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_state = state.clone();
        let handle = builder
            .spawn(move || {
                worker_loop(&receiver, &thread_state);
                thread_state.running.store(false, Ordering::Release);
            })
            .map_err(|err| CalendarError::worker_spawn(config.name.clone(), err))?;

        tracing::debug!(target: targets::WORKER, name = %config.name, "worker started");

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
            state,
            name: config.name,
        })
    }

    /// The worker thread's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the worker still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Jobs queued or running.
    pub fn pending_jobs(&self) -> usize {
        self.state.pending_jobs.load(Ordering::Acquire)
    }

    /// Queue a job. Jobs run in submission order.
    ///
    /// # Errors
    ///
    /// [`CalendarError::WorkerStopped`] after [`stop`](Self::stop), or
    /// [`CalendarError::WorkerBusy`] if the queue is full.
    pub fn send<F>(&self, job: F) -> Result<(), CalendarError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_running() {
            return Err(CalendarError::WorkerStopped);
        }

        self.state.pending_jobs.fetch_add(1, Ordering::AcqRel);
        match self.sender.try_send(Message::Run(Box::new(job))) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state.pending_jobs.fetch_sub(1, Ordering::AcqRel);
                match err {
                    TrySendError::Full(_) => Err(CalendarError::WorkerBusy),
                    TrySendError::Disconnected(_) => Err(CalendarError::WorkerStopped),
                }
            }
        }
    }

    /// Stop accepting jobs. Jobs already queued still run.
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: targets::WORKER, name = %self.name, "worker stopping");
        }
        // With a full queue the loop notices the flag once it drains.
        let _ = self.sender.try_send(Message::Shutdown);
    }

    /// Wait for the worker thread to exit. Call [`stop`](Self::stop) first.
    ///
    /// Returns `false` if already joined or the thread panicked.
    pub fn join(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) if handle.thread().id() != thread::current().id() => {
                handle.join().is_ok()
            }
            // Joining from a job on this worker would deadlock.
            Some(_) | None => false,
        }
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop_and_join(&self) -> bool {
        self.stop();
        self.join()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}

fn worker_loop(receiver: &Receiver<Message>, state: &WorkerState) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                run_job(job, state);
                // Stopped with a full queue, so no shutdown message arrived.
                if !state.running.load(Ordering::Acquire) && receiver.is_empty() {
                    break;
                }
            }
            Message::Shutdown => {
                // Finish what was queued before the shutdown request.
                while let Ok(message) = receiver.try_recv() {
                    if let Message::Run(job) = message {
                        run_job(job, state);
                    }
                }
                break;
            }
        }
    }
}

fn run_job(job: Job, state: &WorkerState) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!(target: targets::WORKER, "worker job panicked");
    }
    state.pending_jobs.fetch_sub(1, Ordering::AcqRel);
}

static_assertions::assert_impl_all!(Worker: Send, Sync);
