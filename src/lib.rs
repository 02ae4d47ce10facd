//! # m4k
//!
//! Turns a directory of downloaded manga chapters into one archive sized for
//! an e-ink reader, and pushes it to the device over the local network.
//!
//! # Architecture: Build, Then Transfer
//!
//! ```text
//! m4k (desktop)                                   m4k-receiver (device)
//! ─────────────                                   ─────────────────────
//! 1. Scan       downloads/*.cbz
//! 2. Read       each chapter → ComicBook
//! 3. Merge      chapters → one book, pages renumbered
//! 4. Transform  pages → grayscale, device size
//! 5. Save       <dst>/<name>.cbz
//! 6. Upload     ── name frame + archive bytes ──▶   receive → <dest>/<name>.cbz
//! 7. Cleanup    delete the chapter archives
//! ```
//!
//! Each stage finishes before the next starts. Only the transform runs in
//! parallel, on a pool that leaves one core free.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Chapter name parsing (`[12.5] Some_Title`) and file-name sanitizing |
//! | [`comicbook`] | `Page` / `ComicBook` model, CBZ read/write/save, merge |
//! | [`imaging`] | Pure-Rust pixel work: orientation layout, grayscale, Lanczos3 resize, encode |
//! | [`transform`] | Parallel per-page transform with first-error reporting |
//! | [`protocol`] | Length-prefixed transfer protocol, sender and single-shot receiver |
//! | [`scan`] | Finding chapter archives, deleting them after a build |
//! | [`config`] | `m4k.toml` loading, defaults, validation |
//! | [`pipeline`] | The `m4k build` stages and their progress events |
//! | [`output`] | CLI output formatting of progress events |
//!
//! # Design Decisions
//!
//! ## Double-Wide Spreads
//!
//! A landscape page is almost always a two-page spread. By default it is
//! rendered at twice the device width so the reader can pan across it;
//! `--rotate` turns it to portrait instead.
//!
//! ## Reproducible Archives
//!
//! Produced archives store entries uncompressed (JPEG and PNG data does not
//! shrink further) with a fixed timestamp, in page-number order. The same
//! chapters always produce the same bytes.
//!
//! ## No Partial Files
//!
//! Saving and receiving both write to a temporary file in the target
//! directory and rename it into place on success. An interrupted transfer
//! never leaves a truncated `.cbz` for the reader to choke on.
//!
//! ## Trusted Network Only
//!
//! The transfer protocol has no authentication, encryption or checksum. It
//! is meant for a phone hotspot or home LAN between your own machines.

pub mod comicbook;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod protocol;
pub mod scan;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
