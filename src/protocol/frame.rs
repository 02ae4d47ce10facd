//! Length-prefixed frames: 4-byte little-endian length, then the payload.

use super::ProtocolError;
use std::io::{self, Read, Write};

/// Largest frame accepted by [`read_frame`].
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Write one frame. Returns the payload length (header excluded).
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<usize, ProtocolError> {
    let len =
        u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge(payload.len()))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(payload.len())
}

/// Read one frame. Fails if the peer closes before the header or the
/// payload is complete.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut header = [0u8; 4];
    read_full(reader, &mut header)?;

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload)?;
    Ok(payload)
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::ShortFrame {
                    expected: buf.len(),
                    actual: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
