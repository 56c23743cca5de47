//! Rendering: draws the current page's elements and gesture feedback.
//!
//! The pass is a pure function of engine state and the image cache: it reads
//! the elements on the current page, the selection, and the transient gesture
//! bbox, and issues draw calls against a [`Surface`]. It never mutates state,
//! so it can be re-run after every change. In the browser the surface is
//! [`crate::canvas2d::Canvas2d`]; tests use a recording surface.
//!
//! All coordinates passed to the surface are screen pixels.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::consts::{HANDLE_SIZE_PX, TEXT_MARGIN_PT};
use crate::doc::{BoundingBox, Element, ElementKind, FontWeight, TextAlign, TextStyle, VerticalAlign};
use crate::engine::EngineCore;
use crate::hit;
use crate::images::{ImageCache, ImageState};
use crate::input::Tool;
use crate::transform::{Point, Viewport};

const ELEMENT_STROKE: &str = "#3b82f6";
const SELECTED_STROKE: &str = "#f97316";
const PREVIEW_STROKE: &str = "#2563eb";
const PREVIEW_DASH: [f64; 2] = [6.0, 4.0];
const CHECK_MARK: &str = "#111827";
const PLACEHOLDER_FILL: &str = "#f3f4f6";
const FAILED_FILL: &str = "#fee2e2";
const PLACEHOLDER_TEXT: &str = "#6b7280";
const PLACEHOLDER_FONT: &str = "12px sans-serif";
const HANDLE_FILL: &str = "#ffffff";
const DEFAULT_FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

/// Line style for outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke<'a> {
    pub color: &'a str,
    pub width: f64,
    /// Dash pattern in pixels; empty for a solid line.
    pub dash: &'a [f64],
}

impl<'a> Stroke<'a> {
    #[must_use]
    pub fn solid(color: &'a str, width: f64) -> Self {
        Self { color, width, dash: &[] }
    }
}

/// A 2D drawing target in screen pixels.
pub trait Surface {
    /// Decoded image handle the surface can draw.
    type Image;
    type Error;

    /// Reset the whole surface before a pass.
    fn clear(&mut self, width: f64, height: f64) -> Result<(), Self::Error>;
    fn fill_rect(&mut self, rect: BoundingBox, color: &str) -> Result<(), Self::Error>;
    fn stroke_rect(&mut self, rect: BoundingBox, stroke: &Stroke<'_>) -> Result<(), Self::Error>;
    fn stroke_polyline(&mut self, points: &[Point], stroke: &Stroke<'_>) -> Result<(), Self::Error>;
    /// Draw `text` with its alphabetic baseline starting at `at`.
    fn fill_text(&mut self, text: &str, at: Point, font: &str, color: &str) -> Result<(), Self::Error>;
    /// Advance width of `text` in pixels.
    fn measure_text(&mut self, text: &str, font: &str) -> Result<f64, Self::Error>;
    fn draw_image(&mut self, image: &Self::Image, rect: BoundingBox) -> Result<(), Self::Error>;
}

/// A horizontal decoration line, in page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoration {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub thickness: f64,
}

/// Placement of a single line of text inside a field, in page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    /// Start of the baseline.
    pub origin: Point,
    pub underline: Option<Decoration>,
    pub strikethrough: Option<Decoration>,
}

/// Lay out one line of text of measured width `text_width` inside `bbox`.
///
/// The stamping renderer uses the same rules, so the editor preview lines up
/// with the filled document.
#[must_use]
pub fn layout_text(bbox: &BoundingBox, style: &TextStyle, text_width: f64) -> TextLayout {
    let size = style.size;
    let baseline = match style.vertical_align {
        VerticalAlign::Top => bbox.y + size * 0.8 + TEXT_MARGIN_PT,
        VerticalAlign::Middle => bbox.y + bbox.h / 2.0 + size * 0.3,
        VerticalAlign::Bottom => bbox.y + bbox.h - size * 0.2 - TEXT_MARGIN_PT,
    };
    let x = match style.align {
        TextAlign::Left => bbox.x + TEXT_MARGIN_PT,
        TextAlign::Center => bbox.x + (bbox.w - text_width) / 2.0,
        TextAlign::Right => bbox.x + bbox.w - text_width - TEXT_MARGIN_PT,
    };
    let thickness = (size * 0.05).max(0.5);
    let line_at = |y: f64| Decoration { x, y, width: text_width, thickness };
    TextLayout {
        origin: Point::new(x, baseline),
        underline: style.underline.then(|| line_at(baseline + 2.0)),
        strikethrough: style.strikethrough.then(|| line_at(baseline - size * 0.3)),
    }
}

/// CSS font shorthand for `style` at `size_px`.
#[must_use]
pub fn font_css(style: &TextStyle, size_px: f64) -> String {
    let weight = match style.weight {
        FontWeight::Bold => "bold ",
        FontWeight::Normal => "",
    };
    let family = style.font.as_deref().unwrap_or(DEFAULT_FONT_FAMILY);
    format!("{weight}{size_px}px {family}")
}

/// Draw the full scene: elements on the current page, the transient bbox, then handles.
///
/// # Errors
///
/// Returns the first error reported by the surface.
pub fn draw<S: Surface>(surface: &mut S, core: &EngineCore, images: &ImageCache<S::Image>) -> Result<(), S::Error> {
    let viewport = &core.viewport;
    surface.clear(viewport.display_width, viewport.display_height)?;

    let selected_id = core.ui.selected_id.as_ref();
    for element in core.doc.on_page(core.ui.page) {
        draw_element(surface, element, viewport, images, selected_id == Some(&element.id))?;
    }

    if let Some(bbox) = core.transient_bbox() {
        let stroke = Stroke { color: PREVIEW_STROKE, width: 1.0, dash: &PREVIEW_DASH };
        surface.stroke_rect(screen_rect(viewport, &bbox), &stroke)?;
    }

    if core.ui.tool == Tool::Select {
        if let Some(selected) = core.selection().filter(|e| e.page == core.ui.page && e.is_resizable()) {
            draw_handles(surface, &selected.bbox, viewport)?;
        }
    }
    Ok(())
}

/// Screen rectangle of a page-unit bbox.
#[must_use]
pub fn screen_rect(viewport: &Viewport, bbox: &BoundingBox) -> BoundingBox {
    let tl = viewport.page_to_screen(Point::new(bbox.x, bbox.y));
    let br = viewport.page_to_screen(Point::new(bbox.x + bbox.w, bbox.y + bbox.h));
    BoundingBox::from_corners(tl, br)
}

// =============================================================
// Element dispatch
// =============================================================

fn draw_element<S: Surface>(
    surface: &mut S,
    element: &Element,
    viewport: &Viewport,
    images: &ImageCache<S::Image>,
    selected: bool,
) -> Result<(), S::Error> {
    let rect = screen_rect(viewport, &element.bbox);
    match &element.kind {
        ElementKind::Text { style } => draw_text_field(surface, element, style, viewport)?,
        ElementKind::Checkbox => draw_checkbox(surface, rect, !element.data_path.is_empty())?,
        ElementKind::Image { image_path } => draw_image_field(surface, rect, images, image_path)?,
        ElementKind::Repeat(_) => {}
    }
    let outline = if selected { Stroke::solid(SELECTED_STROKE, 2.0) } else { Stroke::solid(ELEMENT_STROKE, 1.0) };
    surface.stroke_rect(rect, &outline)
}

fn draw_text_field<S: Surface>(surface: &mut S, element: &Element, style: &TextStyle, viewport: &Viewport) -> Result<(), S::Error> {
    let rect = screen_rect(viewport, &element.bbox);
    if let Some(background) = style.background() {
        surface.fill_rect(rect, background)?;
    }
    let label = element.data_path.as_str();
    if label.is_empty() {
        return Ok(());
    }

    let font = font_css(style, style.size * viewport.scale_y());
    let width_px = surface.measure_text(label, &font)?;
    let layout = layout_text(&element.bbox, style, width_px / viewport.scale_x());

    let origin = viewport.page_to_screen(layout.origin);
    surface.fill_text(label, origin, &font, &style.color)?;
    for line in [layout.underline, layout.strikethrough].into_iter().flatten() {
        let start = viewport.page_to_screen(Point::new(line.x, line.y));
        let thickness = line.thickness * viewport.scale_y();
        let bar = BoundingBox::new(start.x, start.y - thickness / 2.0, width_px, thickness);
        surface.fill_rect(bar, &style.color)?;
    }
    Ok(())
}

fn draw_checkbox<S: Surface>(surface: &mut S, rect: BoundingBox, checked: bool) -> Result<(), S::Error> {
    if !checked {
        return Ok(());
    }
    let mark = [
        Point::new(rect.x + rect.w * 0.2, rect.y + rect.h * 0.5),
        Point::new(rect.x + rect.w * 0.42, rect.y + rect.h * 0.72),
        Point::new(rect.x + rect.w * 0.8, rect.y + rect.h * 0.28),
    ];
    surface.stroke_polyline(&mark, &Stroke::solid(CHECK_MARK, (rect.w * 0.1).max(1.5)))
}

fn draw_image_field<S: Surface>(
    surface: &mut S,
    rect: BoundingBox,
    images: &ImageCache<S::Image>,
    image_path: &str,
) -> Result<(), S::Error> {
    let (fill, caption) = match images.state(image_path) {
        Some(ImageState::Ready(image)) => return surface.draw_image(image, rect),
        Some(ImageState::Loading) => (PLACEHOLDER_FILL, "Loading image"),
        Some(ImageState::Failed) => (FAILED_FILL, "Image unavailable"),
        None => (PLACEHOLDER_FILL, "Image"),
    };
    surface.fill_rect(rect, fill)?;
    surface.fill_text(caption, Point::new(rect.x + 4.0, rect.y + 14.0), PLACEHOLDER_FONT, PLACEHOLDER_TEXT)
}

// =============================================================
// Selection UI
// =============================================================

fn draw_handles<S: Surface>(surface: &mut S, bbox: &BoundingBox, viewport: &Viewport) -> Result<(), S::Error> {
    let stroke = Stroke::solid(SELECTED_STROKE, 1.0);
    for corner in hit::handle_positions(bbox, viewport) {
        let square = BoundingBox::centered_square(corner, HANDLE_SIZE_PX);
        surface.fill_rect(square, HANDLE_FILL)?;
        surface.stroke_rect(square, &stroke)?;
    }
    Ok(())
}
