//! Coordinate transform between page units and on-screen pixels.
//!
//! Page units are the document's native points with the origin at the top-left
//! of the page and y growing downward. Screen pixels are CSS pixels relative
//! to the top-left of the rendered page raster. The mapping is a pure per-axis
//! scale: there is no translation and no y flip, so points and extents
//! (widths, heights, deltas) convert with the same functions.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

use crate::consts::{A4_HEIGHT_PT, A4_WIDTH_PT};

/// A point in either screen or page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Page dimensions in page units (points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    #[serde(rename = "w_pt", default = "default_page_width")]
    pub width: f64,
    #[serde(rename = "h_pt", default = "default_page_height")]
    pub height: f64,
}

fn default_page_width() -> f64 {
    A4_WIDTH_PT
}

fn default_page_height() -> f64 {
    A4_HEIGHT_PT
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

impl PageSize {
    /// ISO A4 portrait.
    pub const A4: Self = Self { width: A4_WIDTH_PT, height: A4_HEIGHT_PT };

    /// Replace non-positive or non-finite dimensions with the A4 defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let width = if self.width.is_finite() && self.width > 0.0 { self.width } else { A4_WIDTH_PT };
        let height = if self.height.is_finite() && self.height > 0.0 { self.height } else { A4_HEIGHT_PT };
        Self { width, height }
    }
}

/// Convert a screen-space point (or extent) to page units.
#[must_use]
pub fn to_page_units(screen_x: f64, screen_y: f64, display_w: f64, display_h: f64, page_w: f64, page_h: f64) -> (f64, f64) {
    (screen_x / display_w * page_w, screen_y / display_h * page_h)
}

/// Convert a page-unit point (or extent) to screen pixels.
#[must_use]
pub fn to_screen(page_x: f64, page_y: f64, page_w: f64, page_h: f64, display_w: f64, display_h: f64) -> (f64, f64) {
    (page_x / page_w * display_w, page_y / page_h * display_h)
}

/// The current mapping between the page and its on-screen raster.
///
/// `display_width` / `display_height` are the rendered surface size in CSS
/// pixels and change with window size and zoom; the host updates them before
/// forwarding pointer events. Until the host reports a size the viewport
/// shows the page at one pixel per point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub display_width: f64,
    pub display_height: f64,
    pub page: PageSize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { display_width: A4_WIDTH_PT, display_height: A4_HEIGHT_PT, page: PageSize::A4 }
    }
}

impl Viewport {
    #[must_use]
    pub fn new(display_width: f64, display_height: f64, page: PageSize) -> Self {
        Self { display_width, display_height, page: page.sanitized() }
    }

    /// Convert a screen-space point to page units.
    #[must_use]
    pub fn screen_to_page(&self, screen: Point) -> Point {
        let (x, y) = to_page_units(
            screen.x,
            screen.y,
            self.display_width,
            self.display_height,
            self.page.width,
            self.page.height,
        );
        Point { x, y }
    }

    /// Convert a page-unit point to screen pixels.
    #[must_use]
    pub fn page_to_screen(&self, page: Point) -> Point {
        let (x, y) = to_screen(page.x, page.y, self.page.width, self.page.height, self.display_width, self.display_height);
        Point { x, y }
    }

    /// Horizontal pixels per page unit.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.display_width / self.page.width
    }

    /// Vertical pixels per page unit.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.display_height / self.page.height
    }

    /// Whether both display dimensions are usable for conversion.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.display_width > 0.0 && self.display_height > 0.0
    }
}
