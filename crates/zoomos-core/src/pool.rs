//! Bounded worker pool with caller-runs backpressure.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Default queue capacity of the pool.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// How a submitted job was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Placed on the queue for a worker.
    Queued,
    /// The queue was full (or the pool shut down), so the caller ran it.
    RanInline,
}

/// Fixed set of worker threads fed from a bounded queue.
///
/// When the queue is full the submitting thread runs the job itself, which
/// slows producers down instead of dropping work.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> io::Result<Self> {
        let (sender, receiver) = bounded::<Job>(config.queue_capacity);
        let workers = (0..config.workers.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("zoomos-worker-{index}"))
                    .spawn(move || worker_loop(index, &receiver))
            })
            .collect::<io::Result<Vec<_>>>()?;
        debug!(workers = workers.len(), queue_capacity = config.queue_capacity, "worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn submit<F>(&self, job: F) -> Submission
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);
        let rejected = match &self.sender {
            Some(sender) => match sender.try_send(job) {
                Ok(()) => return Submission::Queued,
                Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => job,
            },
            None => job,
        };
        debug!("queue full, running job on the submitting thread");
        run_job(rejected);
        Submission::RanInline
    }

    /// Stop accepting work, let workers drain the queue, and join them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(index: usize, receiver: &Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        run_job(job);
    }
    debug!(worker = index, "worker stopped");
}

fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("job panicked");
    }
}
