//! The `m4k build` pipeline.
//!
//! ```text
//! 1. Scan       source dir → chapter archives, in file-name order
//! 2. Read       each archive → ComicBook (pages sorted by number)
//! 3. Merge      books → one book, pages renumbered from 1
//! 4. Transform  every page → device size, grayscale, re-encoded
//! 5. Save       <dst>/<name>.cbz                  (--save)
//! 6. Upload     name frame + archive → receiver   (--upload)
//! 7. Cleanup    delete the source archives        (--cleanup)
//! ```
//!
//! Stages run strictly one after another; the first failure ends the run
//! and later stages (including cleanup) never start.
//!
//! Progress is reported as [`PipelineEvent`]s over an optional channel; the
//! binary turns them into output lines with
//! [`output::format_pipeline_event`](crate::output::format_pipeline_event).

use crate::comicbook::{ArchiveError, merge, read_archive};
use crate::config::{Config, DeviceConfig, effective_threads};
use crate::naming::ChapterInfo;
use crate::protocol::{ProtocolError, send_comic_book};
use crate::scan::{self, ARCHIVE_EXTENSION, ScanError};
use crate::transform::{TransformError, TransformOptions, transform_comic_book};
use log::info;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Nothing to do: enable saving, uploading or both")]
    NothingToDo,
    #[error("No .{ext} archives found in {0}", ext = ARCHIVE_EXTENSION)]
    NoArchives(PathBuf),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Upload failed: {0}")]
    Protocol(#[from] ProtocolError),
}

/// What `m4k build` was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Directory holding the chapter archives.
    pub source: PathBuf,
    /// Display name of the merged book.
    pub name: String,
    /// Where `save` writes the merged archive.
    pub destination: PathBuf,
    pub rotate: bool,
    pub save: bool,
    /// Receiver address, `host` or `host:port`.
    pub upload: Option<String>,
    /// Delete the source archives after a successful run.
    pub cleanup: bool,
}

impl BuildRequest {
    fn validate(&self) -> Result<(), PipelineError> {
        if !self.save && self.upload.is_none() {
            return Err(PipelineError::NothingToDo);
        }
        Ok(())
    }
}

/// Progress of a build, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Scanned {
        dir: PathBuf,
        archives: Vec<PathBuf>,
    },
    ArchiveRead {
        path: PathBuf,
        chapter: String,
        pages: usize,
    },
    Merged {
        name: String,
        chapters: usize,
        pages: usize,
    },
    TransformStarted {
        pages: usize,
        workers: usize,
    },
    /// Fired once per page, in completion order.
    PageTransformed {
        done: usize,
        total: usize,
    },
    Saved {
        path: PathBuf,
        bytes: usize,
    },
    Uploaded {
        addr: String,
        bytes: u64,
    },
    Removed {
        count: usize,
    },
}

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    pub saved: Option<PathBuf>,
    pub uploaded: Option<u64>,
    pub removed: usize,
}

/// Run the whole pipeline for one request.
pub fn build(
    request: &BuildRequest,
    config: &Config,
    events: Option<Sender<PipelineEvent>>,
) -> Result<BuildReport, PipelineError> {
    request.validate()?;
    let emit = |event: PipelineEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    // 1. Scan
    let archives = scan::find_archives(&request.source, ARCHIVE_EXTENSION)?;
    if archives.is_empty() {
        return Err(PipelineError::NoArchives(request.source.clone()));
    }
    emit(PipelineEvent::Scanned {
        dir: request.source.clone(),
        archives: archives.clone(),
    });

    // 2. Read
    let mut books = Vec::with_capacity(archives.len());
    for path in &archives {
        let book = read_archive(path)?;
        emit(PipelineEvent::ArchiveRead {
            path: path.clone(),
            chapter: ChapterInfo::from_name(&book.name).title(),
            pages: book.len(),
        });
        books.push(book);
    }

    // 3. Merge
    let chapters = books.len();
    let mut book = merge(books, &request.name);
    emit(PipelineEvent::Merged {
        name: book.name.clone(),
        chapters,
        pages: book.len(),
    });

    // 4. Transform
    let workers = effective_threads(&config.processing);
    let options = transform_options(
        &config.device,
        request.rotate,
        workers,
        book.len(),
        events.clone(),
    );
    emit(PipelineEvent::TransformStarted {
        pages: book.len(),
        workers,
    });
    transform_comic_book(&mut book, &options)?;
    info!("Transformed {} pages of {}", book.len(), book.name);

    // 5. Save
    let saved = if request.save {
        let path = book.save(&request.destination)?;
        emit(PipelineEvent::Saved {
            path: path.clone(),
            bytes: book.archive_bytes()?.len(),
        });
        Some(path)
    } else {
        None
    };

    // 6. Upload
    let uploaded = match &request.upload {
        Some(addr) => {
            let addr = with_default_port(addr, config.transfer.port);
            let bytes = send_comic_book(&addr, &book, &config.transfer.timeouts())?;
            emit(PipelineEvent::Uploaded { addr, bytes });
            Some(bytes)
        }
        None => None,
    };

    // 7. Cleanup
    let removed = if request.cleanup {
        scan::remove_files(&archives)?;
        emit(PipelineEvent::Removed {
            count: archives.len(),
        });
        archives.len()
    } else {
        0
    };

    Ok(BuildReport {
        pages: book.len(),
        saved,
        uploaded,
        removed,
    })
}

/// Transform options for the device, reporting each finished page.
pub fn transform_options(
    device: &DeviceConfig,
    rotate: bool,
    workers: usize,
    total: usize,
    events: Option<Sender<PipelineEvent>>,
) -> TransformOptions {
    let options = TransformOptions::new(device.width, device.height, device.encoding)
        .rotate(rotate)
        .quality(device.quality)
        .workers(workers);

    match events {
        Some(tx) => {
            let finished = AtomicUsize::new(0);
            options.on_page(move || {
                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                let _ = tx.send(PipelineEvent::PageTransformed { done, total });
            })
        }
        None => options,
    }
}

/// Append `port` to an address that has none.
///
/// Bare IPv6 addresses are bracketed: `::1` becomes `[::1]:49494`.
pub fn with_default_port(addr: &str, port: u16) -> String {
    if addr.parse::<SocketAddr>().is_ok() {
        return addr.to_string();
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    match addr.rsplit_once(':') {
        Some((_, p)) if p.parse::<u16>().is_ok() => addr.to_string(),
        _ => format!("{addr}:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ReceiveOutcome, Receiver, ReceiverTimeouts};
    use crate::test_helpers::{decoded_dimensions, png_bytes, write_cbz};
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::TempDir;

    fn small_device() -> Config {
        let mut config = Config::default();
        config.device.width = 30;
        config.device.height = 40;
        config.processing.max_processes = Some(2);
        config
    }

    fn request(source: &Path) -> BuildRequest {
        BuildRequest {
            source: source.to_path_buf(),
            name: "Merged: Book".to_string(),
            destination: source.to_path_buf(),
            rotate: false,
            save: true,
            upload: None,
            cleanup: false,
        }
    }

    fn two_chapters(dir: &Path) -> Vec<PathBuf> {
        vec![
            write_cbz(
                dir,
                "0001_[1] Start.cbz",
                &[("2.png", png_bytes(60, 80)), ("1.png", png_bytes(60, 80))],
            ),
            write_cbz(dir, "0002_[2] Spread.cbz", &[("1.png", png_bytes(120, 80))]),
        ]
    }

    // =========================================================================
    // with_default_port
    // =========================================================================

    #[test]
    fn default_port_appended_to_bare_host() {
        assert_eq!(with_default_port("kindle.local", 49494), "kindle.local:49494");
        assert_eq!(with_default_port("192.168.1.20", 49494), "192.168.1.20:49494");
    }

    #[test]
    fn explicit_port_kept() {
        assert_eq!(with_default_port("kindle.local:5000", 49494), "kindle.local:5000");
        assert_eq!(with_default_port("192.168.1.20:5000", 49494), "192.168.1.20:5000");
        assert_eq!(with_default_port("[::1]:5000", 49494), "[::1]:5000");
    }

    #[test]
    fn bare_ipv6_is_bracketed() {
        assert_eq!(with_default_port("::1", 49494), "[::1]:49494");
    }

    // =========================================================================
    // build
    // =========================================================================

    #[test]
    fn build_requires_save_or_upload() {
        let tmp = TempDir::new().unwrap();
        let req = BuildRequest {
            save: false,
            ..request(tmp.path())
        };
        assert!(matches!(
            build(&req, &small_device(), None),
            Err(PipelineError::NothingToDo)
        ));
    }

    #[test]
    fn build_with_no_archives_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            build(&request(tmp.path()), &small_device(), None),
            Err(PipelineError::NoArchives(_))
        ));
    }

    #[test]
    fn build_saves_merged_transformed_book() {
        let tmp = TempDir::new().unwrap();
        let sources = two_chapters(tmp.path());

        let report = build(&request(tmp.path()), &small_device(), None).unwrap();

        let saved = report.saved.unwrap();
        assert_eq!(saved, tmp.path().join("Merged_ Book.cbz"));
        assert_eq!(report.pages, 3);
        assert_eq!(report.removed, 0);
        assert!(sources.iter().all(|p| p.exists()));

        let book = read_archive(&saved).unwrap();
        let dims: Vec<(u32, u32)> = book
            .pages()
            .iter()
            .map(|p| decoded_dimensions(&p.data))
            .collect();
        // Spread page is double-wide.
        assert_eq!(dims, vec![(30, 40), (30, 40), (60, 40)]);
    }

    #[test]
    fn build_reports_events_in_stage_order() {
        let tmp = TempDir::new().unwrap();
        two_chapters(tmp.path());
        let (tx, rx) = mpsc::channel();

        build(&request(tmp.path()), &small_device(), Some(tx)).unwrap();
        let events: Vec<PipelineEvent> = rx.iter().collect();

        assert!(matches!(
            &events[0],
            PipelineEvent::Scanned { archives, .. } if archives.len() == 2
        ));
        assert!(matches!(
            &events[1],
            PipelineEvent::ArchiveRead { chapter, pages: 2, .. } if chapter == "Chapter 1.0 - Start"
        ));
        assert!(matches!(
            &events[3],
            PipelineEvent::Merged { chapters: 2, pages: 3, .. }
        ));
        assert!(matches!(
            &events[4],
            PipelineEvent::TransformStarted { pages: 3, .. }
        ));

        let mut progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::PageTransformed { done, total: 3 } => Some(*done),
                _ => None,
            })
            .collect();
        progress.sort();
        assert_eq!(progress, vec![1, 2, 3]);
        assert!(matches!(events.last(), Some(PipelineEvent::Saved { .. })));
    }

    #[test]
    fn cleanup_removes_sources_after_success() {
        let tmp = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let sources = two_chapters(tmp.path());
        let req = BuildRequest {
            destination: out.path().to_path_buf(),
            cleanup: true,
            ..request(tmp.path())
        };

        let report = build(&req, &small_device(), None).unwrap();

        assert_eq!(report.removed, 2);
        assert!(sources.iter().all(|p| !p.exists()));
        assert!(out.path().join("Merged_ Book.cbz").exists());
    }

    #[test]
    fn failed_transform_keeps_sources_and_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_cbz(
            tmp.path(),
            "0001_[1] Bad.cbz",
            &[("1.jpg", b"not an image".to_vec())],
        );
        let req = BuildRequest {
            destination: out.path().to_path_buf(),
            cleanup: true,
            ..request(tmp.path())
        };

        let result = build(&req, &small_device(), None);

        assert!(matches!(
            result,
            Err(PipelineError::Transform(TransformError::Page { .. }))
        ));
        assert!(source.exists());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn build_uploads_to_receiver() {
        let tmp = TempDir::new().unwrap();
        let device = TempDir::new().unwrap();
        two_chapters(tmp.path());

        let receiver = Receiver::bind(
            "127.0.0.1:0",
            device.path(),
            ReceiverTimeouts {
                accept: std::time::Duration::from_secs(10),
                ..ReceiverTimeouts::default()
            },
        )
        .unwrap();
        let addr = receiver.local_addr().unwrap();
        let (_stop, stop_rx) = mpsc::channel();
        let handle = thread::spawn(move || receiver.run(&stop_rx));

        let req = BuildRequest {
            save: false,
            upload: Some(addr.to_string()),
            ..request(tmp.path())
        };
        let report = build(&req, &small_device(), None).unwrap();

        let outcome = handle.join().unwrap().unwrap();
        let received = device.path().join("Merged_ Book.cbz");
        assert_eq!(outcome, ReceiveOutcome::Received(received.clone()));
        assert_eq!(
            report.uploaded,
            Some(fs::metadata(&received).unwrap().len())
        );
        assert_eq!(read_archive(&received).unwrap().len(), 3);
    }
}
