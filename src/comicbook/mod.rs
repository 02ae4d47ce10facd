//! Comic book model: ordered pages plus the archive they serialize to.
//!
//! A [`ComicBook`] is either read from one chapter archive
//! ([`read_archive`]) or produced by merging several ([`merge`]). Pages are
//! kept sorted by [`Page::number`], which is also the order they are written
//! back out in.
//!
//! ## Serialized archive
//!
//! Serializing is done once and memoized: the pipeline finishes every page
//! mutation (transform) before the first read of [`ComicBook::archive_bytes`],
//! and both saving and sending reuse the same buffer. Mutable access to the
//! pages goes through [`ComicBook::pages_mut`], which drops the memoized
//! buffer, so a stale archive can never be observed.
//!
//! ## Produced layout
//!
//! ```text
//! Volume 1/
//! ├── Chapter 1.0 - Start/
//! │   ├── 000001.jpg
//! │   └── 000002.jpg
//! └── Chapter 1.5 - Omake/
//!     └── 000003.jpg
//! ```

mod archive;
mod merge;

pub use archive::{ArchiveError, read_archive};
pub use merge::merge;

use crate::naming::{ChapterInfo, output_stem};
use std::io::Cursor;
use std::sync::OnceLock;

/// One page image and where it belongs.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Encoded image bytes, replaced wholesale by the transform.
    pub data: Vec<u8>,
    /// Position in reading order; unique within a book.
    pub number: u64,
    /// Current encoding as a dotted extension (`.jpg`, `.png`).
    pub extension: String,
    /// Chapter the page came from. Owned per page, never shared.
    pub chapter: ChapterInfo,
}

impl Page {
    /// Entry path inside a produced archive, e.g. `Volume 1/Chapter 2.0 - Rain/000014.jpg`.
    ///
    /// Also used to identify the page in error messages.
    pub fn path(&self) -> String {
        format!(
            "Volume {}/{}/{:06}{}",
            self.chapter.volume,
            output_stem(&self.chapter.title()),
            self.number,
            self.extension
        )
    }
}

/// Ordered pages plus a display name.
#[derive(Debug, Clone)]
pub struct ComicBook {
    /// Display name; the output file name is derived from it.
    pub name: String,
    pages: Vec<Page>,
    archive: OnceLock<Vec<u8>>,
}

impl ComicBook {
    /// Create a book, sorting the pages by number.
    ///
    /// Archives don't guarantee entry order, so sorting happens here rather
    /// than being left to callers.
    pub fn new(name: impl Into<String>, mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.number);
        Self {
            name: name.into(),
            pages,
            archive: OnceLock::new(),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Mutable page access. Invalidates the memoized archive.
    pub fn pages_mut(&mut self) -> &mut [Page] {
        self.archive.take();
        &mut self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Output archive file name: sanitized display name plus `.cbz`.
    pub fn file_name(&self) -> String {
        format!("{}.cbz", output_stem(&self.name))
    }

    /// Serialized archive, computed on first call and reused afterwards.
    pub fn archive_bytes(&self) -> Result<&[u8], ArchiveError> {
        if let Some(bytes) = self.archive.get() {
            return Ok(bytes);
        }
        let bytes = self.write_to(Cursor::new(Vec::new()))?.into_inner();
        Ok(self.archive.get_or_init(|| bytes))
    }

    /// Reader over the serialized archive.
    pub fn reader(&self) -> Result<Cursor<&[u8]>, ArchiveError> {
        Ok(Cursor::new(self.archive_bytes()?))
    }

    #[cfg(test)]
    pub(crate) fn is_serialized(&self) -> bool {
        self.archive.get().is_some()
    }
}
