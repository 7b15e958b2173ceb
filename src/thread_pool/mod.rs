//! Fixed-size thread pool with ordered, statically chunked batches.
//!
//! A [`ThreadPool`] starts its workers once and keeps them until it is shut
//! down. Every batch submitted with [`ThreadPool::par_map`] or
//! [`ThreadPool::try_par_map`] is split in contiguous chunks, the chunks are
//! handed to the workers round robin, and the results come back in the same
//! order as the input.
//!
//! Workers never share state: each task value is moved into the worker that
//! runs it, and the only thing a worker sends back is the result.
use log::{debug, error, info, trace, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use std::{fmt, hint, thread};

use crate::core::configuration::Configuration;
use crate::mpsc::channel::{Channel, InputChannel, OutputChannel};

pub mod err;
#[cfg(test)]
mod test;

use err::{BatchError, PoolError, TaskFailure};

type Func = Box<dyn FnOnce() + Send + 'static>;

enum Job {
    NewJob(Func),
    Terminate,
}

/// Lifecycle of a [`ThreadPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Workers are being spawned.
    Uninitialized,
    /// The pool accepts batches.
    Running,
    /// Workers have been asked to terminate.
    ShuttingDown,
    /// All workers have been joined.
    Closed,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PoolState::Uninitialized => "uninitialized",
            PoolState::Running => "running",
            PoolState::ShuttingDown => "shutting down",
            PoolState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Struct representing a worker in the thread pool.
struct ThreadPoolWorker {
    id: usize,
    jobs: InputChannel<Job>,
}
impl ThreadPoolWorker {
    /// This is the main loop of the thread.
    /// It ends on a terminate message or when the pool drops its side of the channel.
    fn run(&self) {
        trace!("Worker {} started", self.id);
        loop {
            match self.jobs.receive() {
                Ok(Some(Job::NewJob(func))) => (func)(),
                Ok(Some(Job::Terminate)) => break,
                Ok(None) => thread::yield_now(),
                Err(_) => break,
            }
        }
        trace!("Worker {} now will end", self.id);
    }
}

/// A worker thread, optionally pinned to a core.
struct Thread {
    thread: Option<thread::JoinHandle<()>>,
}
impl Thread {
    fn new<F>(worker_id: usize, f: F, configuration: &Configuration) -> Result<Thread, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let pinning = configuration.get_pinning();
        let pinning_position = configuration.get_pinning_position(worker_id);
        let handle = thread::Builder::new()
            .name(format!("popcolor-worker-{}", worker_id))
            .spawn(move || {
                if pinning {
                    pin_current_thread(pinning_position);
                }
                (f)();
            })
            .map_err(|e| PoolError::WorkerStartup(e.to_string()))?;
        Ok(Thread {
            thread: Some(handle),
        })
    }

    /// Join the thread.
    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let name = thread.thread().name().unwrap_or("worker").to_string();
            if thread.join().is_err() {
                error!("{} terminated with a panic", name);
            }
        }
    }
}

fn pin_current_thread(position: usize) {
    let core = core_affinity::get_core_ids().and_then(|ids| ids.get(position).copied());
    match core {
        Some(core) => {
            if core_affinity::set_for_current(core) {
                trace!("Thread pinned on core {}.", core.id);
            } else {
                error!("Thread pinning on core {} failed!", core.id);
            }
        }
        None => error!("Cannot pin the thread in the chosen position {}.", position),
    }
}

/// Handle kept by the pool for each worker.
struct WorkerHandle {
    jobs: OutputChannel<Job>,
    thread: Thread,
}

/// Struct representing a thread pool.
pub struct ThreadPool {
    workers: Vec<WorkerHandle>,
    state: PoolState,
    configuration: Arc<Configuration>,
}

impl ThreadPool {
    fn build(configuration: Arc<Configuration>) -> Result<Self, PoolError> {
        let num_workers = configuration.get_max_cores();
        trace!("Creating new threadpool with {} workers", num_workers);
        if num_workers == 0 {
            return Err(PoolError::WorkerStartup(
                "a pool needs at least one worker".to_string(),
            ));
        }

        let mut pool = ThreadPool {
            workers: Vec::with_capacity(num_workers),
            state: PoolState::Uninitialized,
            configuration,
        };

        for id in 0..num_workers {
            // Job channels always block, idle workers must not spin.
            let (rx, tx) = Channel::channel(true);
            let worker = ThreadPoolWorker { id, jobs: rx };
            // On failure the workers already started are torn down by drop.
            let thread = Thread::new(id, move || worker.run(), &pool.configuration)?;
            pool.workers.push(WorkerHandle { jobs: tx, thread });
        }

        pool.state = PoolState::Running;
        Ok(pool)
    }

    /// Create a new thread pool configured from the environment.
    /// The number of workers defaults to the number of available cores.
    ///
    /// # Examples
    ///
    /// ```
    /// use popcolor::thread_pool::ThreadPool;
    ///
    /// let pool = ThreadPool::new().unwrap();
    /// assert!(pool.num_workers() > 0);
    /// ```
    pub fn new() -> Result<Self, PoolError> {
        Self::with_configuration(Arc::new(Configuration::new_default()?))
    }

    /// Create a new thread pool with `num_threads` threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use popcolor::thread_pool::ThreadPool;
    ///
    /// let pool = ThreadPool::with_capacity(4).unwrap();
    /// assert_eq!(pool.num_workers(), 4);
    /// ```
    pub fn with_capacity(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_configuration(Arc::new(Configuration::with_workers(num_threads)?))
    }

    /// Create a new thread pool from an explicit configuration.
    pub fn with_configuration(configuration: Arc<Configuration>) -> Result<Self, PoolError> {
        Self::build(configuration)
    }

    /// Number of workers in the pool.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Current state of the pool.
    pub fn state(&self) -> PoolState {
        self.state
    }

    fn check_running(&self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Running => Ok(()),
            state => Err(PoolError::NotRunning(state)),
        }
    }

    /// Applies in parallel the function `f` on every element of `iter`,
    /// returning the results in the same order as the input.
    ///
    /// A panic inside `f` fails the batch with the index of the element.
    ///
    /// # Examples
    ///
    /// ```
    /// use popcolor::thread_pool::ThreadPool;
    ///
    /// let mut pool = ThreadPool::with_capacity(4).unwrap();
    /// let res = pool.par_map(0..100, |el: i32| el * 2).unwrap();
    ///
    /// assert_eq!(res, (0..100).map(|el| el * 2).collect::<Vec<_>>());
    /// ```
    pub fn par_map<Iter, F, R>(&mut self, iter: Iter, f: F) -> Result<Vec<R>, BatchError<Infallible>>
    where
        Iter: IntoIterator,
        Iter::Item: Send + 'static,
        F: Fn(Iter::Item) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        self.try_par_map(iter, move |el| Ok(f(el)))
    }

    /// Applies in parallel the fallible function `f` on every element of `iter`,
    /// returning the results in the same order as the input.
    ///
    /// The first failing element aborts the batch: elements that have not
    /// started yet are skipped, and once the running ones are done the error is
    /// returned together with the index of the failing element.
    ///
    /// When several elements would fail, the reported one is the lowest index
    /// among those that actually ran. Which ones ran depends on scheduling, so
    /// with more than one worker a lower failing element may have been skipped.
    /// With a single worker the chunks run in input order and the report is
    /// always the first failing element.
    ///
    /// # Examples
    ///
    /// ```
    /// use popcolor::thread_pool::ThreadPool;
    ///
    /// let mut pool = ThreadPool::with_capacity(2).unwrap();
    /// let res = pool.try_par_map(vec!["1", "2", "x"], |el: &str| el.parse::<u32>());
    ///
    /// assert_eq!(res.unwrap_err().task_index(), Some(2));
    /// ```
    pub fn try_par_map<Iter, F, R, E>(&mut self, iter: Iter, f: F) -> Result<Vec<R>, BatchError<E>>
    where
        Iter: IntoIterator,
        Iter::Item: Send + 'static,
        F: Fn(Iter::Item) -> Result<R, E> + Send + Sync + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let tasks: Vec<Iter::Item> = iter.into_iter().collect();
        let chunk_size = match self.configuration.get_chunk_size() {
            Some(size) => size,
            None => tasks.len().div_ceil(self.num_workers().max(1)),
        };
        self.try_par_map_chunked(tasks, chunk_size, f)
    }

    /// Same as [`ThreadPool::try_par_map`], splitting the input in chunks of
    /// `chunk_size` elements. Chunk `i` runs on worker `i % num_workers`.
    pub fn try_par_map_chunked<Iter, F, R, E>(
        &mut self,
        iter: Iter,
        chunk_size: usize,
        f: F,
    ) -> Result<Vec<R>, BatchError<E>>
    where
        Iter: IntoIterator,
        Iter::Item: Send + 'static,
        F: Fn(Iter::Item) -> Result<R, E> + Send + Sync + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.check_running()?;

        let start = Instant::now();
        let chunk_size = chunk_size.max(1);
        let mut tasks = iter.into_iter().enumerate().peekable();
        if tasks.peek().is_none() {
            return Ok(Vec::new());
        }

        let f = Arc::new(f);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (rx, tx) = Channel::channel::<(usize, Result<R, TaskFailure<E>>)>(
            self.configuration.get_blocking_channel(),
        );
        let arc_tx = Arc::new(tx);

        let mut total = 0;
        let mut chunk_id = 0;
        loop {
            let chunk: Vec<_> = tasks.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            total += chunk.len();

            let worker = &self.workers[chunk_id % self.workers.len()];
            let f = Arc::clone(&f);
            let cp = Arc::clone(&arc_tx);
            let cancelled = Arc::clone(&cancelled);
            let job = Job::NewJob(Box::new(move || run_chunk(chunk, &*f, &cp, &cancelled)));
            if worker.jobs.send(job).is_err() {
                warn!("Worker {} is gone, chunk {} is lost", chunk_id % self.workers.len(), chunk_id);
            }
            chunk_id += 1;
        }
        drop(arc_tx);
        debug!("Dispatched {} tasks in {} chunks", total, chunk_id);

        let mut ordered_map = BTreeMap::<usize, R>::new();
        let mut failure: Option<(usize, TaskFailure<E>)> = None;
        loop {
            match rx.receive() {
                Ok(Some((index, Ok(res)))) => {
                    ordered_map.insert(index, res);
                }
                Ok(Some((index, Err(cause)))) => {
                    if failure.as_ref().map_or(true, |(first, _)| index < *first) {
                        failure = Some((index, cause));
                    }
                }
                Ok(None) => hint::spin_loop(),
                // Every chunk has been consumed.
                Err(_) => break,
            }
        }

        info!(
            "Batch of {} tasks on {} workers completed in {:?}",
            total,
            self.workers.len(),
            start.elapsed()
        );

        if let Some((index, cause)) = failure {
            warn!("Task {} failed, discarding {} results", index, ordered_map.len());
            return Err(BatchError::Task { index, cause });
        }
        if ordered_map.len() != total {
            return Err(PoolError::Disconnected {
                expected: total,
                received: ordered_map.len(),
            }
            .into());
        }
        Ok(ordered_map.into_values().collect())
    }

    /// Terminate and join every worker.
    /// Calling it more than once is harmless.
    pub fn shutdown(&mut self) {
        if self.state == PoolState::Closed {
            return;
        }
        self.state = PoolState::ShuttingDown;
        trace!("Shutting down threadpool with {} workers", self.workers.len());

        for worker in &self.workers {
            // A worker that is already gone has nothing left to terminate.
            let _ = worker.jobs.send(Job::Terminate);
        }
        for mut worker in self.workers.drain(..) {
            worker.thread.join();
        }

        self.state = PoolState::Closed;
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs a chunk of tasks, sending back each result with its index.
fn run_chunk<T, R, E, F>(
    chunk: Vec<(usize, T)>,
    f: &F,
    tx: &OutputChannel<(usize, Result<R, TaskFailure<E>>)>,
    cancelled: &AtomicBool,
) where
    F: Fn(T) -> Result<R, E>,
    R: Send,
    E: Send,
{
    for (index, task) in chunk {
        if cancelled.load(Ordering::Acquire) {
            trace!("Skipping task {}, the batch has failed", index);
            continue;
        }
        let res = match panic::catch_unwind(AssertUnwindSafe(|| f(task))) {
            Ok(Ok(res)) => Ok(res),
            Ok(Err(e)) => Err(TaskFailure::Error(e)),
            Err(payload) => Err(TaskFailure::Panic(panic_message(payload))),
        };
        if res.is_err() {
            cancelled.store(true, Ordering::Release);
        }
        if tx.send((index, res)).is_err() {
            error!("Result of task {} cannot be delivered", index);
            return;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs one batch on a pool that lives only for the duration of the call.
///
/// `worker_count` defaults to the configuration from the environment (the
/// number of available cores). The pool is shut down on every exit path.
///
/// # Examples
///
/// ```
/// use popcolor::thread_pool::run_batch;
///
/// let res = run_batch(vec![3, 1, 2], Some(2), |el: u32| Ok::<_, String>(el + 1)).unwrap();
/// assert_eq!(res, vec![4, 2, 3]);
/// ```
pub fn run_batch<Iter, F, R, E>(
    iter: Iter,
    worker_count: Option<usize>,
    f: F,
) -> Result<Vec<R>, BatchError<E>>
where
    Iter: IntoIterator,
    Iter::Item: Send + 'static,
    F: Fn(Iter::Item) -> Result<R, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    let mut pool = match worker_count {
        Some(n) => ThreadPool::with_capacity(n)?,
        None => ThreadPool::new()?,
    };
    pool.try_par_map(iter, f)
}
