//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides the
//! layout of a page from its source dimensions) and the
//! [`backend`](super::backend) (which does the pixel work). This separation
//! allows swapping backends (e.g. for testing with a mock) without changing
//! the orientation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 75). Clamped on construction.
//! - [`Encoding`]: Output image format, with its canonical file extension.
//! - [`PageTarget`]: Device target for a page: dimensions, rotation policy, encoding.
//! - [`RenderParams`]: Resolved instructions for one page: rotate or not, exact output size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown image encoding {0:?} (expected jpeg or png)")]
pub struct UnknownEncoding(pub String);

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
}

impl Encoding {
    /// Canonical dotted extension written into produced archives.
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Jpeg => ".jpg",
            Encoding::Png => ".png",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Jpeg => "jpeg",
            Encoding::Png => "png",
        })
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Encoding::Jpeg),
            "png" => Ok(Encoding::Png),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

/// What a page should look like on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTarget {
    pub width: u32,
    pub height: u32,
    /// Rotate landscape pages instead of rendering them double-wide.
    pub rotate: bool,
    pub encoding: Encoding,
    pub quality: Quality,
}

/// Parameters for rendering one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    /// Rotate 90° counter-clockwise before resizing.
    pub rotate: bool,
    /// Exact output dimensions.
    pub width: u32,
    pub height: u32,
    pub encoding: Encoding,
    pub quality: Quality,
}
