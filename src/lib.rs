//! Most popular color of a batch of images, computed on a fixed pool of
//! worker threads.
//!
//! The crate has two halves:
//! - [`histogram`]: quantizes the pixels of one image and finds the color
//!   bucket covering the most pixels.
//! - [`thread_pool`]: a reusable pool of workers that maps a pure function
//!   over a batch of inputs and returns the results in input order.
//!
//! ```no_run
//! use popcolor::prelude::*;
//!
//! let mut pool = ThreadPool::new().unwrap();
//! let results = pool
//!     .try_par_map(vec!["a.png", "b.jpeg"], compute)
//!     .unwrap();
//! for res in results {
//!     println!("{}", res);
//! }
//! ```
pub mod core;
pub mod histogram;
pub mod mpsc;
pub mod thread_pool;

pub mod prelude {
    //! This module contains the most used types and functions.
    pub use crate::core::configuration::Configuration;
    pub use crate::histogram::err::HistogramError;
    pub use crate::histogram::{compute, dominant_color, ColorBucket, ColorResult, Histogram};
    pub use crate::thread_pool::err::{BatchError, PoolError, TaskFailure};
    pub use crate::thread_pool::{run_batch, PoolState, ThreadPool};
}
