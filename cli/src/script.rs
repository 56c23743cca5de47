//! JSON-lines editing scripts for `formstamp replay`.
//!
//! One event per line, tagged by `event`:
//!
//! ```text
//! {"event":"tool","tool":"text"}
//! {"event":"down","x":100,"y":100}
//! {"event":"move","x":300,"y":150}
//! {"event":"up","x":300,"y":150}
//! {"event":"data_path","path":"customer.name"}
//! ```
//!
//! Coordinates are screen pixels on the replay display. Blank lines and lines
//! starting with `#` are skipped.

use std::path::PathBuf;

use canvas::doc::{ElementId, ElementPatch};
use canvas::engine::{Action, EngineCore};
use canvas::input::{Button, Key, Tool};
use canvas::transform::Point;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Tool { tool: Tool },
    Page { page: u32 },
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Key { key: String },
    /// Answer a pending data-path prompt.
    DataPath { path: String },
    /// Answer a pending image prompt by uploading this file.
    Image { file: PathBuf },
    /// Dismiss a pending prompt.
    Cancel,
    Delete,
    Patch { id: String, patch: ElementPatch },
}

impl ScriptEvent {
    /// Drive the engine with every event that needs no I/O.
    ///
    /// Returns `None` for events the caller has to handle itself.
    pub fn apply(&self, core: &mut EngineCore) -> Option<Vec<Action>> {
        let actions = match self {
            Self::Tool { tool } => core.set_tool(*tool),
            Self::Page { page } => core.set_page(*page),
            Self::Down { x, y } => core.on_pointer_down(Point::new(*x, *y), Button::Primary),
            Self::Move { x, y } => core.on_pointer_move(Point::new(*x, *y)),
            Self::Up { x, y } => core.on_pointer_up(Point::new(*x, *y), Button::Primary),
            Self::Key { key } => core.on_key_down(&Key(key.clone())),
            Self::DataPath { path } => core.submit_data_path(path),
            Self::Cancel => core.cancel_metadata(),
            Self::Delete => core.delete_selected(),
            Self::Patch { id, patch } => core.update_element(&ElementId::from(id.as_str()), patch),
            Self::Image { .. } => return None,
        };
        Some(actions)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("script line {line}: {source}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Parse a whole script. Line numbers in errors are 1-based.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| ScriptError { line: index + 1, source })?;
        events.push(event);
    }
    Ok(events)
}

/// On-screen size of the page raster the script's coordinates refer to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// Parse a `WIDTHxHEIGHT` display size in pixels.
pub fn parse_display(raw: &str) -> Result<DisplaySize, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("invalid width `{w}`"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("invalid height `{h}`"))?;
    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(format!("display size must be positive, got `{raw}`"));
    }
    Ok(DisplaySize { width, height })
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
