//! One archive per connection: a name frame, then the raw archive bytes.

use super::ProtocolError;
use super::frame::{read_frame, write_frame};
use crate::naming::output_stem;
use log::{debug, info};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Send `name` as a frame followed by the whole of `archive`, unframed.
///
/// Returns the number of archive bytes sent. The caller closes the write
/// side afterwards to mark the end of the archive.
pub fn send_archive<W: Write, R: Read>(
    conn: &mut W,
    name: &str,
    mut archive: R,
) -> Result<u64, ProtocolError> {
    write_frame(conn, name.as_bytes())?;
    let sent = io::copy(&mut archive, conn)?;
    conn.flush()?;
    debug!("Sent {name:?}: {sent} archive bytes");
    Ok(sent)
}

/// Receive one archive into `dest_dir` as `<sanitized name>.cbz`.
///
/// Bytes stream into a temporary file next to the destination, which is
/// renamed into place once the peer has closed the connection. On any
/// failure the temporary file is removed and no `.cbz` appears. An existing
/// file with the same name is replaced.
pub fn receive_archive<R: Read>(conn: &mut R, dest_dir: &Path) -> Result<PathBuf, ProtocolError> {
    let name = read_frame(conn)?;
    let name = String::from_utf8_lossy(&name);
    let path = dest_dir.join(format!("{}.cbz", output_stem(&name)));
    debug!("Receiving {name:?} into {}", path.display());

    let mut file = NamedTempFile::new_in(dest_dir)?;
    let received = io::copy(conn, &mut file)?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    file.persist(&path).map_err(|e| ProtocolError::Persist {
        path: path.clone(),
        source: e.error,
    })?;

    info!("Received {} ({received} bytes)", path.display());
    Ok(path)
}
