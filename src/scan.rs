//! Source archive discovery and cleanup.
//!
//! The downloader leaves one archive per chapter in a flat directory, named
//! with a zero-padded index so that file-name order is reading order:
//!
//! ```text
//! downloads/
//! ├── 0001_[1] Romance_Dawn.cbz
//! ├── 0002_[2] They_Call_Him_Straw_Hat_Luffy.cbz
//! ├── 0003_[2.5] Omake.cbz
//! └── notes.txt                      # ignored: wrong extension
//! ```
//!
//! Only the top level is scanned. Matching is on the extension,
//! case-insensitively; the result is sorted by file name.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extension of chapter archives, without the dot.
pub const ARCHIVE_EXTENSION: &str = "cbz";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read directory {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Files directly inside `dir` whose extension is `extension`, sorted by name.
pub fn find_archives(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ScanError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// Delete `paths`, stopping at the first failure.
pub fn remove_files(paths: &[PathBuf]) -> Result<(), ScanError> {
    for path in paths {
        fs::remove_file(path).map_err(|source| ScanError::Remove {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}
