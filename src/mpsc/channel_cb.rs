use super::{channel, err::ChannelError};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Receiving end of a crossbeam channel.
/// A blocking receiver parks on `recv`, the other one polls with `try_recv`.
pub struct CBReceiver<T> {
    rx: Receiver<T>,
    blocking: bool,
}

impl<T: Send> channel::Receiver<T> for CBReceiver<T> {
    fn receive(&self) -> Result<Option<T>, ChannelError> {
        if self.blocking {
            return self
                .rx
                .recv()
                .map(Some)
                .map_err(|e| ChannelError::new(&e.to_string()));
        }
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(e @ TryRecvError::Disconnected) => Err(ChannelError::new(&e.to_string())),
        }
    }
}

pub struct CBSender<T> {
    tx: Sender<T>,
}

impl<T: Send> channel::Sender<T> for CBSender<T> {
    fn send(&self, msg: T) -> Result<(), ChannelError> {
        self.tx
            .send(msg)
            .map_err(|e| ChannelError::new(&e.to_string()))
    }
}

/// Unbounded crossbeam channels.
pub struct Channel;

impl Channel {
    pub fn channel<T: Send + 'static>(
        blocking: bool,
    ) -> (
        Box<dyn channel::Receiver<T> + Sync + Send>,
        Box<dyn channel::Sender<T> + Sync + Send>,
    ) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Box::new(CBReceiver { rx, blocking }),
            Box::new(CBSender { tx }),
        )
    }
}
