//! Pure calculation functions for page layout.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Shape of a source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Taller than wide, or square.
    Portrait,
    /// Wider than tall; usually a two-page spread.
    Landscape,
}

impl Orientation {
    pub fn of(dims: Dimensions) -> Self {
        if dims.width > dims.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Resolved layout for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub rotate: bool,
    pub width: u32,
    pub height: u32,
}

/// Decide how a page is laid out on the device.
///
/// Portrait pages are resized to the target. Landscape pages are either
/// rotated to portrait (`rotate`), or kept as a spread and rendered twice as
/// wide, height unchanged; spreads read better double-wide than sideways.
///
/// # Examples
/// ```
/// # use m4k::imaging::{Dimensions, Layout, calculate_layout};
/// let spread = Dimensions { width: 2000, height: 1400 };
/// assert_eq!(
///     calculate_layout(spread, (1236, 1648), false),
///     Layout { rotate: false, width: 2472, height: 1648 }
/// );
/// assert_eq!(
///     calculate_layout(spread, (1236, 1648), true),
///     Layout { rotate: true, width: 1236, height: 1648 }
/// );
/// ```
pub fn calculate_layout(source: Dimensions, target: (u32, u32), rotate: bool) -> Layout {
    let (width, height) = target;
    match (Orientation::of(source), rotate) {
        (Orientation::Portrait, _) => Layout {
            rotate: false,
            width,
            height,
        },
        (Orientation::Landscape, true) => Layout {
            rotate: true,
            width,
            height,
        },
        (Orientation::Landscape, false) => Layout {
            rotate: false,
            width: width.saturating_mul(2),
            height,
        },
    }
}
