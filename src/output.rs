//! CLI output formatting for the build pipeline.
//!
//! # Output Format
//!
//! ```text
//! Found 2 archives in downloads/
//! Chapter 1.0 - Romance Dawn (53 pages)
//!     Source: 0001_[1] Romance_Dawn.cbz
//! Chapter 2.0 - Straw Hat Luffy (21 pages)
//!     Source: 0002_[2] Straw_Hat_Luffy.cbz
//! Merged 2 chapters into One Piece (74 pages)
//! Transforming 74 pages on 7 workers
//!     8/74
//!     16/74
//!     ...
//!     74/74
//! Saved One Piece.cbz (12.4 MB)
//!     Path: downloads/One Piece.cbz
//! Sent 12.4 MB to 192.168.15.244:49494
//! Removed 2 source archives
//! ```
//!
//! # Architecture
//!
//! [`format_pipeline_event`] returns `Vec<String>` for testability and
//! [`print_pipeline_event`] writes it to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::pipeline::{BuildReport, PipelineEvent};
use std::path::Path;

/// Number of progress lines printed for a full transform.
const PROGRESS_STEPS: usize = 10;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Human-readable byte count: `512 B`, `3.2 KB`, `12.4 MB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Whether page `done` of `total` gets a progress line.
fn is_progress_step(done: usize, total: usize) -> bool {
    let step = (total / PROGRESS_STEPS).max(1);
    done == total || done % step == 0
}

/// Format a single pipeline event as display lines.
///
/// Most page completions produce no line; progress is shown in roughly ten
/// steps plus the final page.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Scanned { dir, archives } => vec![format!(
            "Found {} in {}",
            plural(archives.len(), "archive", "archives"),
            dir.display()
        )],
        PipelineEvent::ArchiveRead {
            path,
            chapter,
            pages,
        } => vec![
            format!("{chapter} ({})", plural(*pages, "page", "pages")),
            format!("    Source: {}", file_name(path)),
        ],
        PipelineEvent::Merged {
            name,
            chapters,
            pages,
        } => vec![format!(
            "Merged {} into {name} ({})",
            plural(*chapters, "chapter", "chapters"),
            plural(*pages, "page", "pages")
        )],
        PipelineEvent::TransformStarted { pages, workers } => vec![format!(
            "Transforming {} on {}",
            plural(*pages, "page", "pages"),
            plural(*workers, "worker", "workers")
        )],
        PipelineEvent::PageTransformed { done, total } => {
            if is_progress_step(*done, *total) {
                vec![format!("    {done}/{total}")]
            } else {
                Vec::new()
            }
        }
        PipelineEvent::Saved { path, bytes } => vec![
            format!("Saved {} ({})", file_name(path), human_size(*bytes as u64)),
            format!("    Path: {}", path.display()),
        ],
        PipelineEvent::Uploaded { addr, bytes } => {
            vec![format!("Sent {} to {addr}", human_size(*bytes))]
        }
        PipelineEvent::Removed { count } => vec![format!(
            "Removed {}",
            plural(*count, "source archive", "source archives")
        )],
    }
}

pub fn print_pipeline_event(event: &PipelineEvent) {
    for line in format_pipeline_event(event) {
        println!("{}", line);
    }
}

/// Final summary line of a build.
pub fn format_build_report(report: &BuildReport) -> String {
    let mut parts = Vec::new();
    if let Some(path) = &report.saved {
        parts.push(format!("saved to {}", path.display()));
    }
    if let Some(bytes) = report.uploaded {
        parts.push(format!("uploaded {}", human_size(bytes)));
    }
    if report.removed > 0 {
        parts.push(format!(
            "removed {}",
            plural(report.removed, "source", "sources")
        ));
    }
    format!(
        "==> Build complete: {}, {}",
        plural(report.pages, "page", "pages"),
        parts.join(", ")
    )
}
