//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Layout** | [`calculate_layout`]: portrait, rotated, or double-wide spread |
//! | **Render** | grayscale + Lanczos3 + JPEG/PNG encode |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for the orientation decision (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{Layout, Orientation, calculate_layout};
pub use operations::{get_dimensions, render_page};
pub use params::{Encoding, PageTarget, Quality, RenderParams, UnknownEncoding};
pub use rust_backend::RustBackend;
