//! Concatenating chapter books into one.

use super::{ComicBook, Page};

/// Merge books into a single book, in the order given.
///
/// Pages keep their data, extension and chapter; only the numbers change,
/// becoming one run `1..=total` across all books. Books are consumed so page
/// data moves instead of being copied.
pub fn merge(books: impl IntoIterator<Item = ComicBook>, name: &str) -> ComicBook {
    let pages: Vec<Page> = books
        .into_iter()
        .flat_map(ComicBook::into_pages)
        .zip(1..)
        .map(|(page, number)| Page { number, ..page })
        .collect();

    ComicBook::new(name, pages)
}
