//! Input model: tools, mouse buttons, keys, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Tool` captures
//! the user's intent at the time of a pointer event. `InputState` is the active
//! gesture being tracked between pointer-down and pointer-up (or, for creation
//! gestures, until the host supplies the missing metadata), carrying all
//! context needed to compute the in-progress bbox and to commit or revert it.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::{BoundingBox, Element, ElementId};
use crate::hit::Handle;
use crate::transform::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Draw a text field.
    Text,
    /// Draw a checkbox.
    Checkbox,
    /// Place an image; a click drops a default-size square.
    Image,
}

impl Tool {
    /// Whether this tool creates elements.
    #[must_use]
    pub fn is_creation(self) -> bool {
        !matches!(self, Self::Select)
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    /// `Delete` or `Backspace`.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.0 == "Delete" || self.0 == "Backspace"
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// The id of the currently selected element, if any. Always re-resolved
    /// against the store; a stale id simply resolves to nothing.
    pub selected_id: Option<ElementId>,
    /// 1-based page currently shown.
    pub page: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self { tool: Tool::Select, selected_id: None, page: 1 }
    }
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is dragging out a new element with a creation tool.
    Drawing {
        tool: Tool,
        /// Screen-space point where the drag started.
        anchor: Point,
        /// Image placeholder dropped at pointer-down; used when the drag stays small.
        provisional: Option<BoundingBox>,
        /// Normalized page-unit bbox shown as the dashed preview.
        preview: Option<BoundingBox>,
    },
    /// The user is moving an existing element.
    DraggingElement {
        id: ElementId,
        /// Screen-space pointer position at pointer-down.
        start_screen: Point,
        /// Element bbox at pointer-down; the drag is computed from it and Escape reverts to it.
        start_bbox: BoundingBox,
    },
    /// The user is resizing the selected element by one of its corner handles.
    Resizing {
        id: ElementId,
        handle: Handle,
        start_screen: Point,
        start_bbox: BoundingBox,
    },
    /// A drawn element is waiting for its data path or image before it is appended.
    PendingMetadata {
        /// The provisional element; not yet part of the store.
        element: Element,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
