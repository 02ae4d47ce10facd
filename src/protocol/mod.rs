//! Transfer of one archive from the sender to the device.
//!
//! ## Wire format
//!
//! ```text
//! ┌──────────────┬──────────────────┬──────────────────────────────┐
//! │ len: u32 LE  │ name: len bytes  │ archive bytes … until EOF    │
//! └──────────────┴──────────────────┴──────────────────────────────┘
//! ```
//!
//! One connection carries exactly one archive. The name is the only framed
//! value; the archive follows unframed and ends when the sender closes its
//! write side. There is no version field, checksum, authentication or
//! encryption: run it on trusted networks only.
//!
//! ## Lifecycles
//!
//! - [`send_comic_book`]: connect (bounded), send under an overall deadline, close.
//! - [`Receiver::run`]: wait for the first connection, a timeout, or a
//!   shutdown request, whichever comes first; receive one archive; stop.
//!
//! Every read and write on an established connection goes through
//! [`DeadlineStream`], so a stalled peer surfaces as
//! [`io::ErrorKind::TimedOut`] rather than hanging the run.

mod deadline;
mod exchange;
mod frame;
mod receiver;
mod sender;

pub use deadline::DeadlineStream;
pub use exchange::{receive_archive, send_archive};
pub use frame::{MAX_FRAME_LEN, read_frame, write_frame};
pub use receiver::{ReceiveOutcome, Receiver, ReceiverTimeouts};
pub use sender::{SenderTimeouts, connect, send_comic_book};

use crate::comicbook::ArchiveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Transfer I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Connection closed mid-frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },
    #[error("Frame of {0} bytes exceeds the {max} byte limit", max = MAX_FRAME_LEN)]
    FrameTooLarge(usize),
    #[error("Cannot resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },
    #[error("Cannot connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("Cannot serialize archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Cannot store received archive at {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

impl ProtocolError {
    /// Whether the error is a connection deadline breach.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Io(e) if e.kind() == io::ErrorKind::TimedOut)
    }
}
