//! Reliable, ordered delivery of [`Msg`]s between the two parties.
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::{msg::Msg, Error};

/// A reliable, ordered, bidirectional connection to the other party.
///
/// The protocol is strictly lock-step: the garbler uses [`Transport::send_and_wait`] for every
/// request, the evaluator answers each [`Transport::receive`] with exactly one
/// [`Transport::send`].
pub trait Transport {
    /// Sends a message to the other party.
    fn send(&mut self, msg: &Msg) -> Result<(), Error>;

    /// Blocks until the next message of the other party arrives.
    ///
    /// Returns [`Error::Interrupted`] if receiving was stopped from the outside.
    fn receive(&mut self) -> Result<Msg, Error>;

    /// Sends a request and blocks until the reply arrives.
    fn send_and_wait(&mut self, msg: &Msg) -> Result<Msg, Error> {
        self.send(msg)?;
        self.receive()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        (**self).send(msg)
    }

    fn receive(&mut self) -> Result<Msg, Error> {
        (**self).receive()
    }
}

/// One end of an in-process connection, carrying bincode-serialized messages over channels.
pub struct ChannelTransport {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}

/// Creates two connected [`ChannelTransport`]s, e.g. for running both parties as threads.
pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_sender, b_receiver) = channel();
    let (b_sender, a_receiver) = channel();
    let a = ChannelTransport {
        sender: a_sender,
        receiver: a_receiver,
    };
    let b = ChannelTransport {
        sender: b_sender,
        receiver: b_receiver,
    };
    (a, b)
}

impl Transport for ChannelTransport {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        let bytes = bincode::serialize(msg)?;
        self.sender
            .send(bytes)
            .map_err(|_| Error::Transport("the other party has disconnected".into()))
    }

    fn receive(&mut self) -> Result<Msg, Error> {
        let bytes = self
            .receiver
            .recv()
            .map_err(|_| Error::Transport("the other party has disconnected".into()))?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_pair() {
        let (mut a, mut b) = channel_pair();
        a.send(&Msg::Exhausted(true)).unwrap();
        assert_eq!(b.receive().unwrap(), Msg::Exhausted(true));
        b.send(&Msg::Ack).unwrap();
        assert_eq!(a.receive().unwrap(), Msg::Ack);

        drop(b);
        assert!(matches!(a.send_and_wait(&Msg::Exit), Err(Error::Transport(_))));
    }
}
