use super::ProtocolError;
use super::deadline::DeadlineStream;
use super::exchange::receive_archive;
use log::{debug, info};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time limits for one receiver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverTimeouts {
    /// How long to wait for the sender to connect.
    pub accept: Duration,
    /// Whole transfer once connected.
    pub connection: Duration,
}

impl Default for ReceiverTimeouts {
    fn default() -> Self {
        Self {
            accept: Duration::from_secs(5 * 60),
            connection: Duration::from_secs(15 * 60),
        }
    }
}

/// How a receiver run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// An archive was stored at this path.
    Received(PathBuf),
    /// Nobody connected within the accept timeout.
    TimedOut,
    /// Shutdown was requested before anybody connected.
    Shutdown,
}

enum Waited {
    Connection(TcpStream, SocketAddr),
    TimedOut,
    Shutdown,
}

/// Single-shot listener: accepts at most one connection, then stops.
#[derive(Debug)]
pub struct Receiver {
    listener: TcpListener,
    destination: PathBuf,
    timeouts: ReceiverTimeouts,
}

impl Receiver {
    pub fn bind(
        addr: impl ToSocketAddrs,
        destination: impl Into<PathBuf>,
        timeouts: ReceiverTimeouts,
    ) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            destination: destination.into(),
            timeouts,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Wait for one sender and receive its archive.
    ///
    /// Whichever comes first ends the wait: a connection, the accept
    /// timeout, or a message on `shutdown`. Once a connection is accepted
    /// the transfer runs to completion (or its deadline) regardless of
    /// `shutdown`. The listener is closed when this returns.
    pub fn run(self, shutdown: &mpsc::Receiver<()>) -> Result<ReceiveOutcome, ProtocolError> {
        info!(
            "Waiting up to {}s for a sender on {}",
            self.timeouts.accept.as_secs(),
            self.local_addr()?
        );

        match self.wait(shutdown)? {
            Waited::TimedOut => {
                info!("No sender connected, giving up");
                Ok(ReceiveOutcome::TimedOut)
            }
            Waited::Shutdown => {
                info!("Shutdown requested, no longer waiting");
                Ok(ReceiveOutcome::Shutdown)
            }
            Waited::Connection(stream, peer) => {
                info!("Accepted connection from {peer}");
                stream.set_nonblocking(false)?;
                let mut conn = DeadlineStream::new(stream, self.timeouts.connection);
                let path = receive_archive(&mut conn, &self.destination)?;
                Ok(ReceiveOutcome::Received(path))
            }
        }
    }

    fn wait(&self, shutdown: &mpsc::Receiver<()>) -> Result<Waited, ProtocolError> {
        let give_up = Instant::now() + self.timeouts.accept;
        loop {
            match shutdown.try_recv() {
                Ok(()) => return Ok(Waited::Shutdown),
                // A dropped sender only means nobody can ask any more.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }

            match self.listener.accept() {
                Ok((stream, peer)) => return Ok(Waited::Connection(stream, peer)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= give_up {
                        return Ok(Waited::TimedOut);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("Accept failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }
}
