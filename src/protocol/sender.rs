use super::ProtocolError;
use super::deadline::DeadlineStream;
use super::exchange::send_archive;
use crate::comicbook::ComicBook;
use log::{debug, info};
use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Time limits for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderTimeouts {
    /// Per resolved address.
    pub connect: Duration,
    /// Whole transfer, from connect to close.
    pub io: Duration,
}

impl Default for SenderTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            io: Duration::from_secs(10 * 60),
        }
    }
}

/// Connect to `addr` (`host:port`), trying each resolved address in turn.
pub fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, ProtocolError> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|source| ProtocolError::Resolve {
            addr: addr.to_string(),
            source,
        })?;

    let mut last_error = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                debug!("Connected to {candidate}");
                return Ok(stream);
            }
            Err(e) => {
                debug!("Connect to {candidate} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(source) => ProtocolError::Connect {
            addr: addr.to_string(),
            source,
        },
        None => ProtocolError::Resolve {
            addr: addr.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
        },
    })
}

/// Upload a book to a receiver at `addr`.
///
/// The archive is serialized before connecting, so an unwritable book never
/// opens a connection. The connection is closed on every exit path.
pub fn send_comic_book(
    addr: &str,
    book: &ComicBook,
    timeouts: &SenderTimeouts,
) -> Result<u64, ProtocolError> {
    let archive = book.reader()?;
    let stream = connect(addr, timeouts.connect)?;
    let mut conn = DeadlineStream::new(stream, timeouts.io);

    let sent = send_archive(&mut conn, &book.name, archive)?;
    conn.get_ref().shutdown(Shutdown::Write)?;

    info!("Sent {} to {addr} ({sent} bytes)", book.file_name());
    Ok(sent)
}
