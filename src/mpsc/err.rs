use std::{error, fmt};

/// An error returned by the [`receive`] and [`send`] methods.
///
/// The other side of the channel has been dropped, so the message could not
/// be delivered (or will never arrive).
///
/// [`receive`]: super::channel::InputChannel::receive
/// [`send`]: super::channel::OutputChannel::send
#[derive(Debug)]
pub struct ChannelError {
    details: String,
}

impl ChannelError {
    pub fn new(msg: &str) -> ChannelError {
        ChannelError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl error::Error for ChannelError {}
