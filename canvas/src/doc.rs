//! Document model: field elements, their styles, and the ordered working set.
//!
//! This module defines the data that describes what is placed on a template
//! (`Element`, `ElementKind`, `TextStyle`, `BoundingBox`), a sparse-update
//! type for property edits (`ElementPatch`), and the runtime store that owns
//! the working set (`ElementStore`).
//!
//! Storage order is meaningful only for overlap: later elements sit on top for
//! hit-testing and drawing. Page grouping is derived by filtering on
//! `Element::page`; there is no per-page container.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::consts::DEFAULT_FONT_SIZE_PT;
use crate::transform::Point;

/// Opaque, stable identifier of an element.
///
/// Ids loaded from a template are kept verbatim; new ids are generated with
/// [`ElementId::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    /// A fresh id of the form `elem_<uuid>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("elem_{}", Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Axis-aligned rectangle in page units, top-left origin, y down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Normalized box spanned by two corner points, in whichever order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self { x: a.x.min(b.x), y: a.y.min(b.y), w: (b.x - a.x).abs(), h: (b.y - a.y).abs() }
    }

    /// Square box centered on `center`.
    #[must_use]
    pub fn centered_square(center: Point, side: f64) -> Self {
        Self { x: center.x - side / 2.0, y: center.y - side / 2.0, w: side, h: side }
    }

    /// Whether `pt` lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.w && pt.y >= self.y && pt.y <= self.y + self.h
    }

    /// Copy moved by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Same top-left corner, both sides set to `max(w, h, min_side)`.
    #[must_use]
    pub fn squared(&self, min_side: f64) -> Self {
        let side = self.w.abs().max(self.h.abs()).max(min_side);
        Self { w: side, h: side, ..*self }
    }

    /// Rescale to the aspect ratio `width : height` keeping the top-left corner.
    /// The longer side of the result equals the longer side of the box.
    /// Degenerate ratios leave the box as is.
    #[must_use]
    pub fn fit_aspect(&self, width: f64, height: f64) -> Self {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return *self;
        }
        let side = self.w.max(self.h);
        if width >= height {
            Self { w: side, h: side * height / width, ..*self }
        } else {
            Self { w: side * width / height, h: side, ..*self }
        }
    }
}

/// Text weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Horizontal alignment inside the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment inside the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Styling of a text field. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font size in points.
    pub size: f64,
    pub weight: FontWeight,
    pub align: TextAlign,
    /// Text color as `#RRGGBB`.
    pub color: String,
    /// Fill behind the field; `None`, `"transparent"` and `"none"` mean no fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub underline: bool,
    pub strikethrough: bool,
    /// Line height multiplier.
    pub line_height: f64,
    /// Extra spacing between glyphs, in points.
    pub letter_spacing: f64,
    pub vertical_align: VerticalAlign,
    /// Font family hint passed through to the stamping renderer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: DEFAULT_FONT_SIZE_PT,
            weight: FontWeight::Normal,
            align: TextAlign::Left,
            color: "#000000".to_owned(),
            background_color: None,
            underline: false,
            strikethrough: false,
            line_height: 1.2,
            letter_spacing: 0.0,
            vertical_align: VerticalAlign::Top,
            font: None,
        }
    }
}

impl TextStyle {
    /// The background fill to paint, if any.
    #[must_use]
    pub fn background(&self) -> Option<&str> {
        let color = self.background_color.as_deref()?.trim();
        if color.is_empty() || color.eq_ignore_ascii_case("transparent") || color.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(color)
        }
    }
}

/// Per-type payload of an element, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// Free text bound to a data path.
    Text {
        #[serde(default)]
        style: TextStyle,
    },
    /// Check mark; always square.
    Checkbox,
    /// Stamp or signature image stored by the collaborator.
    Image {
        #[serde(default)]
        image_path: String,
    },
    /// Table of rows stamped from an array in the payload. The editor does not
    /// author these; their fields are kept verbatim so saves round-trip them.
    Repeat(Map<String, Value>),
}

impl ElementKind {
    /// Wire name of the variant.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Checkbox => "checkbox",
            Self::Image { .. } => "image",
            Self::Repeat(_) => "repeat",
        }
    }
}

/// A field element as stored in the working set and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// 1-based page number.
    pub page: u32,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub data_path: String,
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl Element {
    /// A new text element with default style.
    #[must_use]
    pub fn text(page: u32, bbox: BoundingBox, data_path: impl Into<String>) -> Self {
        Self {
            id: ElementId::generate(),
            page,
            bbox,
            data_path: data_path.into(),
            kind: ElementKind::Text { style: TextStyle::default() },
        }
    }

    /// A new checkbox element.
    #[must_use]
    pub fn checkbox(page: u32, bbox: BoundingBox, data_path: impl Into<String>) -> Self {
        Self { id: ElementId::generate(), page, bbox, data_path: data_path.into(), kind: ElementKind::Checkbox }
    }

    /// A new image element.
    #[must_use]
    pub fn image(page: u32, bbox: BoundingBox, image_path: impl Into<String>) -> Self {
        Self {
            id: ElementId::generate(),
            page,
            bbox,
            data_path: String::new(),
            kind: ElementKind::Image { image_path: image_path.into() },
        }
    }

    #[must_use]
    pub fn is_checkbox(&self) -> bool {
        matches!(self.kind, ElementKind::Checkbox)
    }

    /// Whether the corner handles apply. Repeat tables can only be moved.
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        !matches!(self.kind, ElementKind::Repeat(_))
    }
}

/// Sparse update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    /// Replaces the style of a text element; ignored for other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
    /// Replaces the image path of an image element; ignored for other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Ordered in-memory working set of elements.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: Vec<Element>,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Append an element on top of all others. An element with the same id is
    /// replaced in place instead.
    pub fn push(&mut self, element: Element) {
        if let Some(existing) = self.elements.iter_mut().find(|e| e.id == element.id) {
            *existing = element;
        } else {
            self.elements.push(element);
        }
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let index = self.elements.iter().position(|e| &e.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Return a reference to an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    /// Return a mutable reference to an element by id.
    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    /// Overwrite an element's bounding box. Returns false if the element doesn't exist.
    pub fn set_bbox(&mut self, id: &ElementId, bbox: BoundingBox) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        element.bbox = bbox;
        true
    }

    /// Apply a patch to an existing element. Returns false if the element doesn't exist.
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        if let Some(page) = patch.page {
            element.page = page.max(1);
        }
        if let Some(bbox) = patch.bbox {
            element.bbox = BoundingBox { w: bbox.w.max(0.0), h: bbox.h.max(0.0), ..bbox };
        }
        if let Some(ref data_path) = patch.data_path {
            element.data_path.clone_from(data_path);
        }
        match &mut element.kind {
            ElementKind::Text { style } => {
                if let Some(ref new_style) = patch.style {
                    style.clone_from(new_style);
                }
            }
            ElementKind::Image { image_path } => {
                if let Some(ref new_path) = patch.image_path {
                    image_path.clone_from(new_path);
                }
            }
            ElementKind::Checkbox | ElementKind::Repeat(_) => {}
        }
        true
    }

    /// Replace all elements with a full snapshot, keeping its order.
    pub fn load(&mut self, elements: Vec<Element>) {
        self.elements = elements;
    }

    /// Elements on `page` in storage order (bottom first).
    pub fn on_page(&self, page: u32) -> impl DoubleEndedIterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.page == page)
    }

    /// All elements in storage order.
    #[must_use]
    pub fn as_slice(&self) -> &[Element] {
        &self.elements
    }

    /// Copy of the working set, suitable for saving or render overrides.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Element> {
        self.elements.clone()
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
