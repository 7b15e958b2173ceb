use std::{error::Error, fmt};

use super::PoolState;
use crate::core::configuration::ConfigurationError;

/// Errors raised by the pool itself, independently of the tasks it runs.
#[derive(Debug)]
pub enum PoolError {
    /// The configuration could not be built.
    Configuration(ConfigurationError),
    /// A worker thread could not be spawned.
    WorkerStartup(String),
    /// The pool is not accepting batches in its current state.
    NotRunning(PoolState),
    /// Some workers went away before delivering all their results.
    Disconnected { expected: usize, received: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolError::Configuration(e) => write!(f, "Invalid pool configuration: {}", e),
            PoolError::WorkerStartup(details) => write!(f, "Cannot start worker: {}", details),
            PoolError::NotRunning(state) => write!(f, "The pool is {}, not running", state),
            PoolError::Disconnected { expected, received } => write!(
                f,
                "Workers disconnected: received {} results out of {}",
                received, expected
            ),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PoolError::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for PoolError {
    fn from(e: ConfigurationError) -> Self {
        PoolError::Configuration(e)
    }
}

/// Why a single task failed.
#[derive(Debug)]
pub enum TaskFailure<E> {
    /// The function returned an error.
    Error(E),
    /// The function panicked. Holds the panic message.
    Panic(String),
}

impl<E: fmt::Display> fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskFailure::Error(e) => write!(f, "{}", e),
            TaskFailure::Panic(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

/// Error returned by a batch.
///
/// When a task fails the rest of the batch is abandoned and the failure is
/// reported together with the position of the task in the input.
#[derive(Debug)]
pub enum BatchError<E> {
    Pool(PoolError),
    Task { index: usize, cause: TaskFailure<E> },
}

impl<E> BatchError<E> {
    /// Index of the failing task, if the batch failed because of a task.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            BatchError::Task { index, .. } => Some(*index),
            BatchError::Pool(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for BatchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchError::Pool(e) => write!(f, "{}", e),
            BatchError::Task { index, cause } => write!(f, "Task {} failed: {}", index, cause),
        }
    }
}

impl<E> Error for BatchError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BatchError::Pool(e) => Some(e),
            BatchError::Task {
                cause: TaskFailure::Error(e),
                ..
            } => Some(e),
            BatchError::Task { .. } => None,
        }
    }
}

impl<E> From<PoolError> for BatchError<E> {
    fn from(e: PoolError) -> Self {
        BatchError::Pool(e)
    }
}
