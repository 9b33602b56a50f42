//! Length-prefixed bincode messages over a TCP connection.
use std::{
    io::{self, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{debug, info};
use yao::{msg::Msg, Error, Transport};

const MAX_RETRIES: usize = 10;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_MESSAGE_LEN: usize = 64 << 20;

/// A TCP connection to the other party.
///
/// Every message is sent as a 4 byte big-endian length followed by the bincode encoding of the
/// message. While waiting for the other party, the connection polls the stop flag every 100ms and
/// fails with [`Error::Interrupted`] once it is set.
pub struct TcpTransport {
    stream: TcpStream,
    stop: Arc<AtomicBool>,
}

fn transport_error(e: io::Error) -> Error {
    Error::Transport(e.to_string())
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

impl TcpTransport {
    /// Connects to a listening party, retrying a few times while it is still starting up.
    pub fn connect(address: &str, stop: Arc<AtomicBool>) -> Result<Self, Error> {
        let mut retries = 0;
        loop {
            match TcpStream::connect(address) {
                Ok(stream) => {
                    info!(address, "connected");
                    return Self::new(stream, stop);
                }
                Err(e) if retries < MAX_RETRIES => {
                    retries += 1;
                    debug!(address, retries, "could not connect: {e}");
                    if stop.load(Ordering::Relaxed) {
                        return Err(Error::Interrupted);
                    }
                    thread::sleep(RETRY_DELAY);
                }
                Err(e) => return Err(transport_error(e)),
            }
        }
    }

    /// Listens on {address} and waits for the other party to connect.
    pub fn accept(address: &str, stop: Arc<AtomicBool>) -> Result<Self, Error> {
        let listener = TcpListener::bind(address).map_err(transport_error)?;
        listener.set_nonblocking(true).map_err(transport_error)?;
        info!(address, "waiting for the other party");
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    info!(%peer, "accepted connection");
                    stream.set_nonblocking(false).map_err(transport_error)?;
                    return Self::new(stream, stop);
                }
                Err(e) if is_timeout(&e) => {
                    if stop.load(Ordering::Relaxed) {
                        return Err(Error::Interrupted);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(transport_error(e)),
            }
        }
    }

    fn new(stream: TcpStream, stop: Arc<AtomicBool>) -> Result<Self, Error> {
        stream.set_nodelay(true).map_err(transport_error)?;
        Ok(Self { stream, stop })
    }

    /// Blocks until data is available, checking the stop flag in between.
    fn wait_readable(&mut self) -> Result<(), Error> {
        self.stream
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(transport_error)?;
        let mut byte = [0u8; 1];
        let result = loop {
            if self.stop.load(Ordering::Relaxed) {
                break Err(Error::Interrupted);
            }
            match self.stream.peek(&mut byte) {
                Ok(0) => {
                    break Err(Error::Transport(
                        "the other party closed the connection".into(),
                    ))
                }
                Ok(_) => break Ok(()),
                Err(e) if is_timeout(&e) => continue,
                Err(e) => break Err(transport_error(e)),
            }
        };
        self.stream.set_read_timeout(None).map_err(transport_error)?;
        result
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        let bytes = bincode::serialize(msg)?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| Error::Transport(format!("message of {} bytes", bytes.len())))?;
        self.stream
            .write_all(&len.to_be_bytes())
            .and_then(|_| self.stream.write_all(&bytes))
            .and_then(|_| self.stream.flush())
            .map_err(transport_error)
    }

    fn receive(&mut self) -> Result<Msg, Error> {
        self.wait_readable()?;
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len).map_err(transport_error)?;
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_MESSAGE_LEN {
            return Err(Error::Transport(format!(
                "message of {len} bytes exceeds the limit of {MAX_MESSAGE_LEN} bytes"
            )));
        }
        let mut bytes = vec![0u8; len];
        self.stream.read_exact(&mut bytes).map_err(transport_error)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_roundtrip() {
        let address = "127.0.0.1:0";
        let listener = TcpListener::bind(address).unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let stop = Arc::new(AtomicBool::new(false));
        let server_stop = stop.clone();
        let server_address = address.clone();
        let server = thread::spawn(move || {
            let mut transport = TcpTransport::accept(&server_address, server_stop).unwrap();
            let msg = transport.receive().unwrap();
            transport.send(&msg).unwrap();
            transport.receive()
        });

        let mut client = TcpTransport::connect(&address, stop.clone()).unwrap();
        let msg = Msg::Output(vec![true, false, true]);
        assert_eq!(client.send_and_wait(&msg).unwrap(), msg);

        stop.store(true, Ordering::Relaxed);
        assert_eq!(server.join().unwrap(), Err(Error::Interrupted));
    }
}
