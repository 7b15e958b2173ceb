use super::err::ChannelError;

#[cfg(all(feature = "crossbeam", not(feature = "flume")))]
use super::channel_cb as backend;

#[cfg(feature = "flume")]
use super::channel_flume as backend;

/// Trait defining a channel receiver.
pub trait Receiver<T> {
    /// Receive a message from the channel.
    ///
    /// A non-blocking receiver returns `Ok(None)` when the channel is empty.
    fn receive(&self) -> Result<Option<T>, ChannelError>;
}

/// Trait defining a channel sender.
pub trait Sender<T> {
    /// Send a message to the channel.
    fn send(&self, msg: T) -> Result<(), ChannelError>;
}

/// Struct defining the receiver side of a channel.
/// The channel backend is selected at compile time by the feature flag.
pub struct InputChannel<T> {
    rx: Box<dyn Receiver<T> + Sync + Send>,
}
impl<T: Send> InputChannel<T> {
    /// Receive a message from the channel.
    pub fn receive(&self) -> Result<Option<T>, ChannelError> {
        self.rx.receive()
    }
}

/// Struct defining the sender side of a channel.
/// The channel backend is selected at compile time by the feature flag.
pub struct OutputChannel<T> {
    tx: Box<dyn Sender<T> + Sync + Send>,
}
impl<T: Send> OutputChannel<T> {
    /// Send a message to the channel.
    pub fn send(&self, msg: T) -> Result<(), ChannelError> {
        self.tx.send(msg)
    }
}

/// Channel factory.
pub struct Channel;

impl Channel {
    /// Create a new unbounded channel.
    /// If `blocking` is true, [`InputChannel::receive`] parks the caller until a
    /// message arrives, otherwise it returns `Ok(None)` on an empty channel.
    pub fn channel<T: Send + 'static>(blocking: bool) -> (InputChannel<T>, OutputChannel<T>) {
        let (rx, tx) = backend::Channel::channel(blocking);
        (InputChannel { rx }, OutputChannel { tx })
    }
}
