//! Page transformation for the reading device.
//!
//! Every page of a [`ComicBook`] goes through the same pipeline:
//!
//! ```text
//! identify → layout (portrait / rotate / double-wide) → grayscale → Lanczos3 resize → encode
//! ```
//!
//! ## Options
//!
//! [`TransformOptions`] is validated once, before any page is touched:
//! width and height must be non-zero, an encoding must be chosen, and a
//! quality (when given) must be within 1–100. Invalid options fail with
//! [`TransformError::Config`] without decoding anything.
//!
//! ## Parallel Processing
//!
//! Pages are transformed on a dedicated [rayon](https://docs.rs/rayon) pool
//! of `cores − 1` workers (at least one), leaving a core for the rest of the
//! host. Each worker owns the page it is working on; nothing else is shared
//! except the backend (which is `Sync`) and the completion callback.
//!
//! The first failing page stops further pages from starting. Pages already
//! in flight are allowed to finish, then the first error is returned with
//! the failing page's archive path. Pages transformed before the failure
//! keep their new data: a failed pass leaves the book partially transformed
//! and it must not be used further.

use crate::comicbook::ComicBook;
use crate::imaging::{
    BackendError, Encoding, ImageBackend, PageTarget, Quality, RustBackend, render_page,
};
use log::debug;
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid transform options: {0}")]
    Config(String),
    #[error("Image transform failed: {0}")]
    Image(#[from] BackendError),
    #[error("While transforming page {path}: {source}")]
    Page {
        path: String,
        source: BackendError,
    },
    #[error("Cannot start transform workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Called once per page after its new image is encoded.
pub type PageCallback = Arc<dyn Fn() + Send + Sync>;

/// Settings for one transform pass.
#[derive(Clone, Default)]
pub struct TransformOptions {
    pub width: u32,
    pub height: u32,
    /// Required; `None` is rejected by [`validate`](Self::validate).
    pub encoding: Option<Encoding>,
    /// Rotate landscape pages instead of rendering them double-wide.
    pub rotate: bool,
    /// JPEG quality, 1–100. Defaults to 75.
    pub quality: Option<u8>,
    /// Worker cap. Defaults to [`default_workers`].
    pub workers: Option<usize>,
    pub on_page: Option<PageCallback>,
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoding", &self.encoding)
            .field("rotate", &self.rotate)
            .field("quality", &self.quality)
            .field("workers", &self.workers)
            .field("on_page", &self.on_page.is_some())
            .finish()
    }
}

impl TransformOptions {
    pub fn new(width: u32, height: u32, encoding: Encoding) -> Self {
        Self {
            width,
            height,
            encoding: Some(encoding),
            ..Default::default()
        }
    }

    pub fn rotate(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn on_page(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_page = Some(Arc::new(callback));
        self
    }

    /// Check the options and resolve them into a device target.
    pub fn validate(&self) -> Result<PageTarget, TransformError> {
        if self.width == 0 || self.height == 0 {
            return Err(TransformError::Config(format!(
                "width and height must be greater than 0 (got {}x{})",
                self.width, self.height
            )));
        }
        let Some(encoding) = self.encoding else {
            return Err(TransformError::Config("an output encoding is required".into()));
        };
        let quality = match self.quality {
            None => Quality::default(),
            Some(q @ 1..=100) => Quality::new(q),
            Some(q) => {
                return Err(TransformError::Config(format!(
                    "quality must be between 1 and 100 (got {q})"
                )));
            }
        };
        if self.workers == Some(0) {
            return Err(TransformError::Config("workers must be at least 1".into()));
        }

        Ok(PageTarget {
            width: self.width,
            height: self.height,
            rotate: self.rotate,
            encoding,
            quality,
        })
    }
}

/// Worker count leaving one core free: `cores − 1`, at least 1.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

fn render_and_notify(
    backend: &impl ImageBackend,
    data: &[u8],
    target: &PageTarget,
    on_page: Option<&(dyn Fn() + Send + Sync)>,
) -> Result<Vec<u8>, BackendError> {
    let out = render_page(backend, data, target)?;
    if let Some(callback) = on_page {
        callback();
    }
    Ok(out)
}

/// Transform one encoded image.
pub fn transform_image(data: &[u8], options: &TransformOptions) -> Result<Vec<u8>, TransformError> {
    transform_image_with_backend(&RustBackend::new(), data, options)
}

/// Transform one encoded image using a specific backend (allows testing with mock).
pub fn transform_image_with_backend(
    backend: &impl ImageBackend,
    data: &[u8],
    options: &TransformOptions,
) -> Result<Vec<u8>, TransformError> {
    let target = options.validate()?;
    Ok(render_and_notify(
        backend,
        data,
        &target,
        options.on_page.as_deref(),
    )?)
}

/// Transform every page of a book in place.
pub fn transform_comic_book(
    book: &mut ComicBook,
    options: &TransformOptions,
) -> Result<(), TransformError> {
    transform_comic_book_with_backend(&RustBackend::new(), book, options)
}

/// Transform every page of a book using a specific backend (allows testing with mock).
pub fn transform_comic_book_with_backend(
    backend: &impl ImageBackend,
    book: &mut ComicBook,
    options: &TransformOptions,
) -> Result<(), TransformError> {
    let target = options.validate()?;
    let workers = options.workers.unwrap_or_else(default_workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("m4k-transform-{i}"))
        .build()?;

    debug!(
        "Transforming {} pages of {} on {} workers",
        book.len(),
        book.name,
        workers
    );

    let on_page = options.on_page.as_deref();
    let extension = target.encoding.extension();
    let failed = AtomicBool::new(false);
    let first_error = OnceLock::new();

    pool.install(|| {
        book.pages_mut().par_iter_mut().for_each(|page| {
            if failed.load(Ordering::Acquire) {
                return;
            }
            match render_and_notify(backend, &page.data, &target, on_page) {
                Ok(data) => {
                    page.data = data;
                    page.extension = extension.to_string();
                }
                Err(source) => {
                    failed.store(true, Ordering::Release);
                    let _ = first_error.set(TransformError::Page {
                        path: page.path(),
                        source,
                    });
                }
            }
        });
    });

    match first_error.into_inner() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
