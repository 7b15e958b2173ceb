//! Core components of the framework.
//!
//! At the moment this is only the [`configuration::Configuration`] shared by
//! every [`ThreadPool`](crate::thread_pool::ThreadPool): how many workers to
//! start, whether and where to pin them, and how results are collected.
pub mod configuration;
