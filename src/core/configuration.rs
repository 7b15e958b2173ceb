use std::{env, error::Error, fmt, str::FromStr};

const MAX_CORES: &str = "POPCOLOR_MAX_CORES";
const PINNING: &str = "POPCOLOR_PINNING";
const THREAD_MAPPING: &str = "POPCOLOR_THREAD_MAPPING";
const BLOCKING_CHANNEL: &str = "POPCOLOR_BLOCKING_CHANNEL";
const CHUNK_SIZE: &str = "POPCOLOR_CHUNK_SIZE";

/// Error returned when an environment variable holds an invalid value.
#[derive(Debug)]
pub struct ConfigurationError {
    details: String,
}

impl ConfigurationError {
    fn new(msg: &str) -> ConfigurationError {
        ConfigurationError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for ConfigurationError {}

/// Pool configuration.
///
/// Every field can be set from the environment:
/// - `POPCOLOR_MAX_CORES`: number of workers (defaults to the available cores).
/// - `POPCOLOR_PINNING`: pin each worker to a core (`true`/`false`).
/// - `POPCOLOR_THREAD_MAPPING`: comma separated list of core ids used for pinning.
/// - `POPCOLOR_BLOCKING_CHANNEL`: block on the result channel instead of spinning.
/// - `POPCOLOR_CHUNK_SIZE`: fixed number of tasks per chunk.
#[derive(Debug, Clone)]
pub struct Configuration {
    max_cores: usize,
    thread_mapping: Vec<usize>,
    pinning: bool,
    blocking_channel: bool,
    chunk_size: Option<usize>,
}

/// Read and parse the environment variable `key`, if set.
fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigurationError> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigurationError::new(&format!("Invalid value for {}: {:?}", key, val))),
        Err(_) => Ok(None),
    }
}

/// Parse the core mapping from the environment variable POPCOLOR_THREAD_MAPPING.
/// Only consulted when pinning is enabled.
fn parse_core_mapping() -> Result<Vec<usize>, ConfigurationError> {
    match env::var(THREAD_MAPPING) {
        Ok(val) => val
            .split(',')
            .map(|id| {
                id.trim().parse::<usize>().map_err(|_| {
                    ConfigurationError::new(&format!("Invalid core id in {}: {:?}", THREAD_MAPPING, id))
                })
            })
            .collect(),
        Err(_) => Ok((0..num_cpus::get()).collect()),
    }
}

impl Configuration {
    /// Build a configuration.
    ///
    /// A zero `max_cores` is accepted here; the pool refuses to start with it.
    pub fn new(
        max_cores: usize,
        pinning: bool,
        blocking_channel: bool,
        chunk_size: Option<usize>,
    ) -> Result<Configuration, ConfigurationError> {
        if chunk_size == Some(0) {
            return Err(ConfigurationError::new("The chunk size must be at least 1"));
        }
        let thread_mapping = if pinning {
            parse_core_mapping()?
        } else {
            Vec::new()
        };

        Ok(Configuration {
            max_cores,
            thread_mapping,
            pinning,
            blocking_channel,
            chunk_size,
        })
    }

    /// Build the configuration from the environment, falling back to the defaults.
    pub fn new_default() -> Result<Configuration, ConfigurationError> {
        let max_cores = parse_var(MAX_CORES)?.unwrap_or_else(num_cpus::get);
        Configuration::from_env(max_cores)
    }

    /// Same as [`Configuration::new_default`], but with `workers` workers.
    /// `POPCOLOR_MAX_CORES` is ignored.
    pub fn with_workers(workers: usize) -> Result<Configuration, ConfigurationError> {
        Configuration::from_env(workers)
    }

    fn from_env(max_cores: usize) -> Result<Configuration, ConfigurationError> {
        let pinning = parse_var(PINNING)?.unwrap_or(false);
        let blocking_channel = parse_var(BLOCKING_CHANNEL)?.unwrap_or(true);
        let chunk_size = parse_var(CHUNK_SIZE)?;
        Configuration::new(max_cores, pinning, blocking_channel, chunk_size)
    }

    /// Get the maximum number of cores allowed.
    pub(crate) fn get_max_cores(&self) -> usize {
        self.max_cores
    }

    /// Core on which the worker `worker_id` is pinned.
    pub(crate) fn get_pinning_position(&self, worker_id: usize) -> usize {
        if self.thread_mapping.is_empty() {
            return worker_id;
        }
        self.thread_mapping[worker_id % self.thread_mapping.len()]
    }

    /// Get the pinning flag.
    pub(crate) fn get_pinning(&self) -> bool {
        self.pinning
    }

    /// Get the blocking channel flag.
    pub(crate) fn get_blocking_channel(&self) -> bool {
        self.blocking_channel
    }

    /// Get the fixed chunk size, if any.
    pub(crate) fn get_chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}
