//! Worker pool for background tasks (save-time asset copying).
//!
//! Uses crossbeam for an MPMC queue with closure-based task execution.
//! The pool is fixed-size and long-lived; callers that need to wait for a
//! batch join it with a `crossbeam::sync::WaitGroup`.

use crossbeam_channel::{unbounded, Sender};
use log::{debug, error};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool for CPU/IO-bound tasks.
///
/// Workers execute arbitrary closures with captured state (payloads).
///
/// # Example
/// ```ignore
/// let workers = Workers::new(4);
/// workers.execute(move || {
///     copy_asset(&source, &target).ok();
/// });
/// ```
pub struct Workers {
    sender: Sender<Job>,
    _handles: Vec<thread::JoinHandle<()>>, // Keep handles to prevent premature drop
    thread_count: usize,
}

impl Workers {
    /// Create worker pool with `num_threads` threads (clamped to at least 1).
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let (tx, rx): (Sender<Job>, _) = unbounded();
        let mut handles = Vec::new();

        for worker_id in 0..num_threads {
            let rx = rx.clone();

            let handle = thread::Builder::new()
                .name(format!("xfldoc-worker-{}", worker_id))
                .spawn(move || {
                    debug!("Worker {} started", worker_id);

                    // Worker loop: execute closures until channel closes
                    while let Ok(job) = rx.recv() {
                        job();
                    }

                    debug!("Worker {} stopped", worker_id);
                })
                .expect("Failed to spawn worker thread");

            handles.push(handle);
        }

        debug!("Workers initialized: {} threads", num_threads);

        Self {
            sender: tx,
            _handles: handles,
            thread_count: num_threads,
        }
    }

    /// Pool sized to the machine, the default for save-time flushes.
    pub fn default_pool() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Execute closure on a worker thread.
    ///
    /// Closure runs asynchronously, no return value. Capture a WaitGroup
    /// handle and a result channel when completion matters.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.sender.send(Box::new(f)) {
            error!("Failed to enqueue job: {}", e);
        }
    }
}

// Drop implementation: channels close automatically, threads exit gracefully
impl Drop for Workers {
    fn drop(&mut self) {
        debug!("Workers shutting down ({} threads)...", self._handles.len());
        // Sender drops → channel closes → workers exit recv() loop
    }
}
