//! CBZ (zip) reading and writing.
//!
//! Reading keeps only image entries (see [`is_image`]) and requires their
//! base names to be page numbers; a single unnumbered image fails the whole
//! archive. Writing stores entries uncompressed (page images are already
//! compressed) with a fixed timestamp, so identical books produce identical
//! bytes.

use super::{ComicBook, Page};
use crate::naming::{ChapterInfo, is_image, path_extension, path_stem, without_padded_index};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read archive {path}: {source}")]
    Read { path: PathBuf, source: ZipError },
    #[error("Cannot extract {entry} from {path}: {source}")]
    Extract {
        path: PathBuf,
        entry: String,
        source: std::io::Error,
    },
    #[error("Page {entry} in {path} is not named by its page number")]
    PageNumber { path: PathBuf, entry: String },
    #[error("Failed to write archive: {0}")]
    Write(#[from] ZipError),
    #[error("Cannot save archive to {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page number from an entry's base name. Digits only: `u64::from_str`
/// alone would also take a leading `+`.
fn page_number(stem: &str) -> Option<u64> {
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Read a chapter archive into a [`ComicBook`].
///
/// The book name is the archive's file stem with any download index removed;
/// the chapter info parsed from it is copied into every page.
pub fn read_archive(path: &Path) -> Result<ComicBook, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let name = without_padded_index(path_stem(&path.to_string_lossy())).to_string();
    let chapter = ChapterInfo::from_name(&name);

    let mut pages = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|source| ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.is_dir() || !is_image(entry.name()) {
            continue;
        }

        let entry_name = entry.name().to_string();
        let number =
            page_number(path_stem(&entry_name)).ok_or_else(|| ArchiveError::PageNumber {
                path: path.to_path_buf(),
                entry: entry_name.clone(),
            })?;

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|source| ArchiveError::Extract {
                path: path.to_path_buf(),
                entry: entry_name.clone(),
                source,
            })?;

        pages.push(Page {
            data,
            number,
            extension: path_extension(&entry_name),
            chapter: chapter.clone(),
        });
    }

    debug!("Read {} pages from {}", pages.len(), path.display());
    Ok(ComicBook::new(name, pages))
}

impl ComicBook {
    /// Write the book as a zip archive, pages in ascending number order.
    ///
    /// Returns the writer once the central directory is written.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, ArchiveError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut ordered: Vec<&Page> = self.pages.iter().collect();
        ordered.sort_by_key(|p| p.number);

        let mut zip = ZipWriter::new(writer);
        for page in ordered {
            zip.start_file(page.path(), options)?;
            zip.write_all(&page.data)?;
        }
        Ok(zip.finish()?)
    }

    /// Save the archive as `<dir>/<file_name>`, replacing any existing file.
    ///
    /// The bytes go to a temporary file in `dir` first and are renamed into
    /// place at the end, so a failed save never leaves a partial archive.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ArchiveError> {
        let path = dir.join(self.file_name());
        let save_error = |source| ArchiveError::Save {
            path: path.clone(),
            source,
        };

        let mut file = NamedTempFile::new_in(dir).map_err(save_error)?;
        file.write_all(self.archive_bytes()?).map_err(save_error)?;
        file.as_file().sync_all().map_err(save_error)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(save_error)?;
        }
        file.persist(&path).map_err(|e| save_error(e.error))?;

        debug!("Saved {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{chapter_names, page, page_numbers, write_cbz};
    use std::io::Cursor;
    use tempfile::TempDir;

    // =========================================================================
    // Reading
    // =========================================================================

    #[test]
    fn read_sorts_pages_regardless_of_entry_order() {
        let tmp = TempDir::new().unwrap();
        let path = write_cbz(
            tmp.path(),
            "0001_[1] Start.cbz",
            &[
                ("10.jpg", b"ten".to_vec()),
                ("2.jpg", b"two".to_vec()),
                ("ComicInfo.xml", b"<xml/>".to_vec()),
                ("1.png", b"one".to_vec()),
            ],
        );

        let book = read_archive(&path).unwrap();
        assert_eq!(book.name, "[1] Start");
        assert_eq!(page_numbers(&book), vec![1, 2, 10]);
        assert_eq!(book.pages()[0].data, b"one");
        assert_eq!(book.pages()[0].extension, ".png");
        assert_eq!(book.pages()[2].extension, ".jpg");
    }

    #[test]
    fn read_attaches_chapter_info_to_every_page() {
        let tmp = TempDir::new().unwrap();
        let path = write_cbz(
            tmp.path(),
            "0003_[12.5] Some_Title.cbz",
            &[("1.jpg", vec![1]), ("2.jpg", vec![2])],
        );

        let book = read_archive(&path).unwrap();
        assert_eq!(chapter_names(&book), vec!["Some Title", "Some Title"]);
        assert!(book.pages().iter().all(|p| p.chapter.number == 12.5));
    }

    #[test]
    fn read_entries_in_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let path = write_cbz(
            tmp.path(),
            "[2] Rain.cbz",
            &[("pages/002.jpg", vec![2]), ("pages/001.jpg", vec![1])],
        );

        let book = read_archive(&path).unwrap();
        assert_eq!(page_numbers(&book), vec![1, 2]);
    }

    #[test]
    fn read_non_numeric_page_fails() {
        let tmp = TempDir::new().unwrap();
        let path = write_cbz(
            tmp.path(),
            "[1] Start.cbz",
            &[("1.jpg", vec![1]), ("cover.jpg", vec![0])],
        );

        let result = read_archive(&path);
        assert!(
            matches!(&result, Err(ArchiveError::PageNumber { entry, .. }) if entry == "cover.jpg")
        );
    }

    #[test]
    fn read_signed_page_number_fails() {
        let tmp = TempDir::new().unwrap();
        let path = write_cbz(
            tmp.path(),
            "[1] Start.cbz",
            &[("1.jpg", vec![1]), ("+5.jpg", vec![0])],
        );

        let result = read_archive(&path);
        assert!(
            matches!(&result, Err(ArchiveError::PageNumber { entry, .. }) if entry == "+5.jpg")
        );
    }

    #[test]
    fn page_number_accepts_only_digits() {
        assert_eq!(page_number("007"), Some(7));
        assert_eq!(page_number("12"), Some(12));
        assert_eq!(page_number("+5"), None);
        assert_eq!(page_number("-1"), None);
        assert_eq!(page_number(" 3"), None);
        assert_eq!(page_number(""), None);
        assert_eq!(page_number("99999999999999999999999"), None);
    }

    #[test]
    fn read_missing_archive_fails() {
        let tmp = TempDir::new().unwrap();
        let result = read_archive(&tmp.path().join("missing.cbz"));
        assert!(matches!(result, Err(ArchiveError::Open { .. })));
    }

    #[test]
    fn read_corrupt_archive_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.cbz");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let result = read_archive(&path);
        assert!(matches!(result, Err(ArchiveError::Read { .. })));
    }

    // =========================================================================
    // Writing
    // =========================================================================

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(str::to_string).collect()
    }

    #[test]
    fn write_uses_volume_chapter_layout_in_number_order() {
        let start = ChapterInfo::from_name("[1] Start");
        let omake = ChapterInfo::from_name("[1.5] Omake");
        let mut book = ComicBook::new(
            "Book",
            vec![page(&start, 1, b"a"), page(&omake, 3, b"c"), page(&start, 2, b"b")],
        );
        // Scramble numbers after construction; output must still follow them.
        book.pages_mut()[0].number = 4;

        let names = entry_names(book.archive_bytes().unwrap());
        assert_eq!(
            names,
            vec![
                "Volume 1/Chapter 1.0 - Start/000002.jpg",
                "Volume 1/Chapter 1.5 - Omake/000003.jpg",
                "Volume 1/Chapter 1.0 - Start/000004.jpg",
            ]
        );
    }

    #[test]
    fn write_is_byte_reproducible() {
        let chapter = ChapterInfo::from_name("[1] Start");
        let make = || {
            ComicBook::new(
                "Book",
                vec![page(&chapter, 2, b"b"), page(&chapter, 1, b"a")],
            )
        };

        let first = make().archive_bytes().unwrap().to_vec();
        let second = make().archive_bytes().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn written_archive_round_trips_page_data() {
        let tmp = TempDir::new().unwrap();
        let chapter = ChapterInfo::from_name("[1] Start");
        let book = ComicBook::new(
            "[1] Start",
            vec![page(&chapter, 1, b"first"), page(&chapter, 2, b"second")],
        );

        let path = tmp.path().join(book.file_name());
        std::fs::write(&path, book.archive_bytes().unwrap()).unwrap();

        let reread = read_archive(&path).unwrap();
        assert_eq!(page_numbers(&reread), vec![1, 2]);
        assert_eq!(reread.pages()[1].data, b"second");
        assert_eq!(reread.pages()[1].chapter, chapter);
    }

    // =========================================================================
    // Saving
    // =========================================================================

    #[test]
    fn save_writes_archive_under_sanitized_name() {
        let tmp = TempDir::new().unwrap();
        let chapter = ChapterInfo::from_name("[1] Start");
        let book = ComicBook::new("Book: One/Two", vec![page(&chapter, 1, b"a")]);

        let path = book.save(tmp.path()).unwrap();

        assert_eq!(path, tmp.path().join("Book_ One_Two.cbz"));
        assert_eq!(std::fs::read(&path).unwrap(), book.archive_bytes().unwrap());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_replaces_existing_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Book.cbz"), b"stale").unwrap();

        let book = ComicBook::new("Book", Vec::new());
        let path = book.save(tmp.path()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), book.archive_bytes().unwrap());
    }

    #[test]
    fn save_into_missing_directory_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");

        let result = ComicBook::new("Book", Vec::new()).save(&missing);
        assert!(matches!(result, Err(ArchiveError::Save { .. })));
        assert!(!missing.exists());
    }
}
