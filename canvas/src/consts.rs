//! Shared numeric constants for the canvas crate.

// ── Page ────────────────────────────────────────────────────────

/// A4 portrait width in points.
pub const A4_WIDTH_PT: f64 = 595.28;

/// A4 portrait height in points.
pub const A4_HEIGHT_PT: f64 = 841.89;

// ── Gestures ────────────────────────────────────────────────────

/// Screen-space distance in pixels within which a corner handle is hit.
pub const HANDLE_TOLERANCE_PX: f64 = 8.0;

/// Side length of a drawn corner handle, in screen pixels.
pub const HANDLE_SIZE_PX: f64 = 8.0;

/// Drags must exceed this many screen pixels on both axes to create an element.
/// Also the minimum on-screen extent while resizing.
pub const MIN_GESTURE_PX: f64 = 5.0;

/// Smallest side, in page units, a checkbox is normalized to on commit.
pub const MIN_CHECKBOX_PT: f64 = 5.0;

/// Side of the provisional square placed by a plain image-tool click, in page units.
pub const DEFAULT_IMAGE_SIZE_PT: f64 = 100.0;

/// Data path stamped on every new checkbox; its presence marks the box as checked.
pub const CHECKBOX_DATA_PATH: &str = "checked";

// ── Text layout (page units) ────────────────────────────────────

/// Inset from the field edge for left/right aligned text and top/bottom aligned baselines.
pub const TEXT_MARGIN_PT: f64 = 5.0;

/// Default font size for new text fields.
pub const DEFAULT_FONT_SIZE_PT: f64 = 10.0;

// ── Data paths ──────────────────────────────────────────────────

/// Largest array index a data path may name. Inserting pads arrays up to the index.
pub const MAX_DATA_PATH_INDEX: usize = 10_000;
