//! Centralized file-name parsing for chapter archives and pages.
//!
//! Chapter archives produced by the usual downloaders follow one convention:
//!
//! ```text
//! 0007_[12.5] The_Long_Night.cbz
//! ^^^^ ^^^^^^ ^^^^^^^^^^^^^^
//!  |     |         └── chapter title, underscores for spaces
//!  |     └── chapter number, optionally bracketed, may be fractional
//!  └── zero-padded download index (optional, stripped)
//! ```
//!
//! Pages inside an archive are named by their sequence number
//! (`001.jpg`, `17.png`). Anything that doesn't follow these conventions is
//! kept verbatim rather than rejected: a chapter without a parseable number
//! is still a chapter, just numbered 0.
//!
//! ## Display Titles
//!
//! Chapter directories inside produced archives are titled
//! `Chapter <number> - <name>`, unless the name already starts with
//! `Chapter` (downloaders often embed it), in which case the name is used
//! as-is:
//! - `[12.5] Some_Title` → "Chapter 12.5 - Some Title"
//! - `[3] Chapter_3_Return` → "Chapter 3 Return"

use std::fmt;
use std::path::Path;

/// Image entries recognised inside an archive.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Characters that may not appear in an output name.
const INVALID_NAME_CHARS: &[char] = &['/', '\\', ':'];

/// Used when sanitizing leaves nothing behind.
const FALLBACK_NAME: &str = "untitled";

/// Provenance of a page: which chapter (and volume) it came from.
///
/// Derived once per source archive and copied by value into every page, so
/// merging can renumber pages without the pages sharing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterInfo {
    /// Chapter title, underscores already replaced by spaces.
    pub name: String,
    /// Chapter number; fractional for side chapters (`10.5`).
    pub number: f64,
    pub volume: u32,
}

impl ChapterInfo {
    /// Parse a chapter from an archive name (without extension and index).
    ///
    /// - `"[12.5] Some_Title"` → number=12.5, name="Some Title", volume=1
    /// - `"7 Start"` → number=7, name="Start"
    /// - `"NoNumberHere"` → number=0, name="NoNumberHere"
    /// - `"Extra Story"` → number=0, name="Extra Story" (left token isn't a number)
    pub fn from_name(name: &str) -> Self {
        let verbatim = Self {
            name: name.to_string(),
            number: 0.0,
            volume: 1,
        };

        let Some((number_part, title)) = name.split_once(' ') else {
            return verbatim;
        };

        let number_part = number_part.trim_matches(|c| c == '[' || c == ']');
        match number_part.parse::<f64>() {
            Ok(number) if number.is_finite() => Self {
                name: title.replace('_', " "),
                number,
                volume: 1,
            },
            _ => verbatim,
        }
    }

    /// Directory title used inside produced archives.
    pub fn title(&self) -> String {
        if self.name.starts_with("Chapter") {
            self.name.clone()
        } else {
            format!("Chapter {:.1} - {}", self.number, self.name)
        }
    }
}

impl fmt::Display for ChapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// File name without directories and extension.
///
/// Works for both filesystem paths and archive entry names (`a/b/001.jpg` → `001`).
pub fn path_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

/// Extension including the leading dot (`.jpg`), or empty.
pub fn path_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// Strip a leading zero-padded download index (`0007_`) from an archive name.
///
/// Only a purely numeric segment (optionally bracketed) counts as an index, so
/// `"[12.5] Some_Title"` is left alone.
pub fn without_padded_index(name: &str) -> &str {
    match name.split_once('_') {
        Some((prefix, rest)) if is_padded_index(prefix) => rest,
        _ => name,
    }
}

fn is_padded_index(segment: &str) -> bool {
    let digits = segment.trim_matches(|c| c == '[' || c == ']');
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Whether an archive entry is a page image (as opposed to metadata like `ComicInfo.xml`).
pub fn is_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Make a display name safe to use as a single path component.
///
/// Separators and colons become underscores, runs of underscores collapse
/// to one, and leading/trailing underscores and whitespace are trimmed.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut prev = None;

    for c in name.chars() {
        let c = if INVALID_NAME_CHARS.contains(&c) { '_' } else { c };
        if !(c == '_' && prev == Some('_')) {
            sanitized.push(c);
        }
        prev = Some(c);
    }

    sanitized
        .trim_matches(|c: char| c == '_' || c.is_whitespace())
        .to_string()
}

/// Sanitized name, falling back to `untitled` when nothing usable remains.
pub fn output_stem(name: &str) -> String {
    let sanitized = sanitize_name(name);
    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Chapter parsing
    // =========================================================================

    #[test]
    fn bracketed_fractional_chapter() {
        let info = ChapterInfo::from_name("[12.5] Some_Title");
        assert_eq!(info.number, 12.5);
        assert_eq!(info.name, "Some Title");
        assert_eq!(info.volume, 1);
    }

    #[test]
    fn plain_integer_chapter() {
        let info = ChapterInfo::from_name("7 The_Start");
        assert_eq!(info.number, 7.0);
        assert_eq!(info.name, "The Start");
    }

    #[test]
    fn no_space_keeps_name_verbatim() {
        let info = ChapterInfo::from_name("NoNumberHere");
        assert_eq!(info.number, 0.0);
        assert_eq!(info.name, "NoNumberHere");
        assert_eq!(info.volume, 1);
    }

    #[test]
    fn unparseable_number_keeps_whole_name() {
        let info = ChapterInfo::from_name("Extra Story_Part");
        assert_eq!(info.number, 0.0);
        assert_eq!(info.name, "Extra Story_Part");
    }

    #[test]
    fn non_finite_number_is_not_a_chapter_number() {
        let info = ChapterInfo::from_name("inf Loop");
        assert_eq!(info.number, 0.0);
        assert_eq!(info.name, "inf Loop");
    }

    #[test]
    fn only_first_space_splits() {
        let info = ChapterInfo::from_name("[3] A Long_Title Here");
        assert_eq!(info.number, 3.0);
        assert_eq!(info.name, "A Long Title Here");
    }

    // =========================================================================
    // Titles
    // =========================================================================

    #[test]
    fn title_adds_chapter_prefix() {
        let info = ChapterInfo::from_name("[12.5] Some_Title");
        assert_eq!(info.title(), "Chapter 12.5 - Some Title");
    }

    #[test]
    fn title_formats_integer_with_one_decimal() {
        let info = ChapterInfo::from_name("[4] Rain");
        assert_eq!(info.title(), "Chapter 4.0 - Rain");
    }

    #[test]
    fn title_keeps_existing_chapter_prefix() {
        let info = ChapterInfo::from_name("[3] Chapter_3_Return");
        assert_eq!(info.title(), "Chapter 3 Return");
        assert_eq!(info.to_string(), "Chapter 3 Return");
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    #[test]
    fn path_stem_strips_dirs_and_extension() {
        assert_eq!(path_stem("chapter/sub/001.jpg"), "001");
        assert_eq!(path_stem("/tmp/0001_[1] A.cbz"), "0001_[1] A");
        assert_eq!(path_stem("42"), "42");
    }

    #[test]
    fn path_extension_keeps_dot() {
        assert_eq!(path_extension("a/001.jpg"), ".jpg");
        assert_eq!(path_extension("a/001"), "");
    }

    #[test]
    fn padded_index_is_stripped() {
        assert_eq!(without_padded_index("0007_[12.5] The_Night"), "[12.5] The_Night");
        assert_eq!(without_padded_index("[0007]_[1] A"), "[1] A");
    }

    #[test]
    fn non_numeric_prefix_is_kept() {
        assert_eq!(without_padded_index("[12.5] Some_Title"), "[12.5] Some_Title");
        assert_eq!(without_padded_index("Plain"), "Plain");
    }

    #[test]
    fn is_image_by_extension() {
        assert!(is_image("001.jpg"));
        assert!(is_image("dir/002.JPEG"));
        assert!(is_image("003.png"));
        assert!(!is_image("ComicInfo.xml"));
        assert!(!is_image("004.webp"));
        assert!(!is_image("jpg"));
    }

    // =========================================================================
    // Sanitizing
    // =========================================================================

    #[test]
    fn sanitize_replaces_separators_and_colons() {
        assert_eq!(sanitize_name("Vol 1: Start/End"), "Vol 1_ Start_End");
        assert_eq!(sanitize_name(r"a\b"), "a_b");
    }

    #[test]
    fn sanitize_collapses_underscore_runs() {
        assert_eq!(sanitize_name("a__b///c"), "a_b_c");
    }

    #[test]
    fn sanitize_trims_underscores_and_whitespace() {
        assert_eq!(sanitize_name("  _/Title:_ "), "Title");
    }

    #[test]
    fn output_stem_falls_back_when_empty() {
        assert_eq!(output_stem("//:"), "untitled");
        assert_eq!(output_stem("Berserk"), "Berserk");
    }
}
