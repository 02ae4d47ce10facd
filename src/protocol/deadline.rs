use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// A TCP stream with one wall-clock deadline covering every read and write.
///
/// Before each operation the socket timeout is set to the time left, so the
/// connection as a whole cannot outlive the deadline no matter how the
/// transfer is split into calls. A breach fails with
/// [`io::ErrorKind::TimedOut`].
#[derive(Debug)]
pub struct DeadlineStream {
    stream: TcpStream,
    expires: Instant,
}

impl DeadlineStream {
    pub fn new(stream: TcpStream, limit: Duration) -> Self {
        Self {
            stream,
            expires: Instant::now() + limit,
        }
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    fn remaining(&self) -> io::Result<Duration> {
        self.expires
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
            .ok_or_else(deadline_exceeded)
    }
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "connection deadline exceeded")
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn normalize(err: io::Error) -> io::Error {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => deadline_exceeded(),
        _ => err,
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.remaining()?;
        self.stream.set_read_timeout(Some(left))?;
        self.stream.read(buf).map_err(normalize)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let left = self.remaining()?;
        self.stream.set_write_timeout(Some(left))?;
        self.stream.write(buf).map_err(normalize)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
