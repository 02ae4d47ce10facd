//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take the device target, compute the page layout, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_layout;
use super::params::{PageTarget, RenderParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, data: &[u8]) -> Result<Dimensions> {
    backend.identify(data)
}

/// Render one page image for the device.
///
/// Identifies the source to pick the layout (see
/// [`calculate_layout`](super::calculate_layout)), then renders it in one
/// backend call.
pub fn render_page(
    backend: &impl ImageBackend,
    data: &[u8],
    target: &PageTarget,
) -> Result<Vec<u8>> {
    let source = get_dimensions(backend, data)?;
    let layout = calculate_layout(source, (target.width, target.height), target.rotate);

    backend.render(
        data,
        &RenderParams {
            rotate: layout.rotate,
            width: layout.width,
            height: layout.height,
            encoding: target.encoding,
            quality: target.quality,
        },
    )
}
