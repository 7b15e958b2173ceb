use flume::{Receiver, Sender, TryRecvError};

use super::{channel, err::ChannelError};

/// Receiving end of a flume channel.
pub struct FlumeReceiver<T> {
    rx: Receiver<T>,
    blocking: bool,
}

impl<T> channel::Receiver<T> for FlumeReceiver<T>
where
    T: Send,
{
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

pub struct FlumeSender<T> {
    tx: Sender<T>,
}

impl<T> channel::Sender<T> for FlumeSender<T>
where
    T: Send,
{
    fn send(&self, msg: T) -> Result<(), ChannelError> {
        self.tx
            .send(msg)
            .map_err(|e| ChannelError::new(&e.to_string()))
    }
}

/// Unbounded flume channels.
pub struct Channel;

impl Channel {
    pub fn channel<T>(
        blocking: bool,
    ) -> (
        Box<dyn channel::Receiver<T> + Sync + Send>,
        Box<dyn channel::Sender<T> + Sync + Send>,
    )
    where
        T: Send + 'static,
    {
        let (tx, rx) = flume::unbounded();
        (
            Box::new(FlumeReceiver { rx, blocking }),
            Box::new(FlumeSender { tx }),
        )
    }
}
