//! Shared test utilities for the m4k test suite.
//!
//! Provides synthetic images, on-disk chapter archives and small extractors
//! over [`ComicBook`] so tests read as assertions about pages rather than
//! about plumbing.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_cbz(tmp.path(), "0001_[1] Start.cbz", &[
//!     ("1.png", png_bytes(30, 40)),
//!     ("2.png", png_bytes(60, 40)),
//! ]);
//! let book = read_archive(&path).unwrap();
//! assert_eq!(page_numbers(&book), vec![1, 2]);
//! ```

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::comicbook::{ComicBook, Page};
use crate::naming::ChapterInfo;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A valid PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// A valid JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

/// Decode bytes and return `(width, height)`. Panics on invalid images.
pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

// =========================================================================
// Archives
// =========================================================================

/// Write a deflate-compressed zip with the given entries, in the given order.
pub fn write_cbz(dir: &Path, file_name: &str, entries: &[(&str, Vec<u8>)]) -> PathBuf {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    let bytes = zip.finish().unwrap().into_inner();

    let path = dir.join(file_name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// =========================================================================
// Pages and books
// =========================================================================

/// A `.jpg` page with arbitrary (not necessarily decodable) data.
pub fn page(chapter: &ChapterInfo, number: u64, data: &[u8]) -> Page {
    Page {
        data: data.to_vec(),
        number,
        extension: ".jpg".to_string(),
        chapter: chapter.clone(),
    }
}

/// All page numbers in book order.
pub fn page_numbers(book: &ComicBook) -> Vec<u64> {
    book.pages().iter().map(|p| p.number).collect()
}

/// Chapter name of every page in book order.
pub fn chapter_names(book: &ComicBook) -> Vec<&str> {
    book.pages()
        .iter()
        .map(|p| p.chapter.name.as_str())
        .collect()
}
