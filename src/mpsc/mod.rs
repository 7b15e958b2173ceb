//! Multi-producer, Single-consumer channels.
//!
//! The thread pool talks to its workers only through these channels: one
//! job channel per worker, and one result channel per batch.
//!
//! The traits are:
//! - [`channel::Receiver<T>`]: defines the receiver side of a channel.
//! - [`channel::Sender<T>`]: defines the sender side of a channel.
//!
//! The structs are:
//! - [`channel::InputChannel<T>`]: defines the receiver side of a channel.
//! - [`channel::OutputChannel<T>`]: defines the sender side of a channel.
//!
//! The channel implementations available are:
//! - **crossbeam**: uses the crossbeam channel (default).
//! - **flume**: uses the flume channel.
//!
//! The channel implementation is selected at compile time by the feature flag.

/// Module containing Traits and Structs to support channel operations.
pub mod channel;
#[cfg(all(feature = "crossbeam", not(feature = "flume")))]
mod channel_cb;
#[cfg(feature = "flume")]
mod channel_flume;
/// Channel errors
pub mod err;
