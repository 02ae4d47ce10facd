//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the page transform
//! needs: identify (read dimensions without a full decode) and render
//! (decode, rotate, resize, grayscale, encode).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Backends work on in-memory bytes: pages never touch the disk
//! between reading the archive and writing the result.

use super::params::RenderParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared by every worker of the
/// transform pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails with [`BackendError::Decode`] for
    /// anything that isn't a supported image.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Produce the encoded output image for one page.
    fn render(&self, data: &[u8], params: &RenderParams) -> Result<Vec<u8>, BackendError>;
}
