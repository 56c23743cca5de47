use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::canvas2d::Canvas2d;
use crate::consts::{CHECKBOX_DATA_PATH, DEFAULT_IMAGE_SIZE_PT, MIN_CHECKBOX_PT, MIN_GESTURE_PX};
use crate::doc::{BoundingBox, Element, ElementId, ElementKind, ElementPatch, ElementStore};
use crate::hit::{self, Handle, HitPart};
use crate::images::ImageCache;
use crate::input::{Button, InputState, Key, Tool, UiState};
use crate::render;
use crate::transform::{PageSize, Point, Viewport};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new element was appended to the working set.
    ElementCreated(Element),
    /// An existing element changed; carries its full new state.
    ElementUpdated(Element),
    ElementDeleted { id: ElementId },
    /// Ask the user for a data path, then call `submit_data_path` or `cancel_metadata`.
    DataPathRequested,
    /// Ask the user for an image, upload it, then call `submit_image` or `cancel_metadata`.
    ImageRequested,
    /// Start loading the stored image at `path` into the image cache.
    LoadImage { path: String },
    /// Route all pointer events to the engine until `ReleasePointer`.
    CapturePointer,
    ReleasePointer,
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug, Default)]
pub struct EngineCore {
    pub doc: ElementStore,
    pub ui: UiState,
    pub input: InputState,
    pub viewport: Viewport,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Data inputs ---

    /// Replace the working set with a template's elements. Any gesture and the
    /// selection are dropped.
    pub fn load_elements(&mut self, elements: Vec<Element>) {
        self.input = InputState::Idle;
        self.ui.selected_id = None;
        self.doc.load(elements);
    }

    /// Set the page size used for coordinate conversion.
    pub fn set_page_size(&mut self, page: PageSize) {
        self.viewport = Viewport::new(self.viewport.display_width, self.viewport.display_height, page);
    }

    /// Update the on-screen size of the page raster, in CSS pixels.
    ///
    /// Non-positive or non-finite sizes are ignored so conversions stay defined.
    pub fn set_viewport(&mut self, display_width: f64, display_height: f64) {
        let candidate = Viewport::new(display_width, display_height, self.viewport.page);
        if candidate.is_valid() && display_width.is_finite() && display_height.is_finite() {
            self.viewport = candidate;
        } else {
            log::warn!("ignoring display size {display_width}x{display_height}");
        }
    }

    /// Apply a property edit to an element. Checkbox bboxes are kept square.
    pub fn update_element(&mut self, id: &ElementId, patch: &ElementPatch) -> Vec<Action> {
        let Some(existing) = self.doc.get(id) else {
            return Vec::new();
        };
        let mut patch = patch.clone();
        if existing.is_checkbox() {
            patch.bbox = patch.bbox.map(|b| b.squared(MIN_CHECKBOX_PT));
        }
        self.doc.apply_patch(id, &patch);
        match self.doc.get(id) {
            Some(element) => vec![Action::ElementUpdated(element.clone()), Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    // --- Tool / page ---

    /// Set the active tool, abandoning any gesture. Creation tools clear the selection.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = self.abandon_gesture();
        self.ui.tool = tool;
        if tool.is_creation() {
            self.ui.selected_id = None;
        }
        let cursor = if tool.is_creation() { "crosshair" } else { "default" };
        actions.push(Action::SetCursor(cursor.to_owned()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Switch to another page (clamped to 1), abandoning any gesture and clearing the selection.
    pub fn set_page(&mut self, page: u32) -> Vec<Action> {
        let mut actions = self.abandon_gesture();
        self.ui.page = page.max(1);
        self.ui.selected_id = None;
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button) -> Vec<Action> {
        if button != Button::Primary || !self.input.is_idle() {
            return Vec::new();
        }
        match self.ui.tool {
            Tool::Select => self.begin_select(screen_pt),
            tool => {
                let provisional = (tool == Tool::Image).then(|| {
                    BoundingBox::centered_square(self.viewport.screen_to_page(screen_pt), DEFAULT_IMAGE_SIZE_PT)
                });
                self.input = InputState::Drawing { tool, anchor: screen_pt, provisional, preview: provisional };
                vec![Action::RenderNeeded]
            }
        }
    }

    fn begin_select(&mut self, screen_pt: Point) -> Vec<Action> {
        let hit = hit::hit_test(&self.doc, self.ui.page, &self.viewport, screen_pt, self.ui.selected_id.as_ref());
        let Some(hit) = hit else {
            self.ui.selected_id = None;
            return vec![Action::RenderNeeded];
        };
        let Some(start_bbox) = self.doc.get(&hit.id).map(|e| e.bbox) else {
            return Vec::new();
        };
        self.ui.selected_id = Some(hit.id.clone());
        let cursor = match hit.part {
            HitPart::Handle(handle) => {
                self.input = InputState::Resizing { id: hit.id, handle, start_screen: screen_pt, start_bbox };
                handle.cursor()
            }
            HitPart::Body => {
                self.input = InputState::DraggingElement { id: hit.id, start_screen: screen_pt, start_bbox };
                "move"
            }
        };
        vec![Action::CapturePointer, Action::SetCursor(cursor.to_owned()), Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point) -> Vec<Action> {
        match &mut self.input {
            InputState::Idle => vec![Action::SetCursor(self.hover_cursor(screen_pt).to_owned())],
            InputState::Drawing { tool, anchor, provisional, preview } => {
                *preview = if *tool == Tool::Image && !exceeds_min_gesture(*anchor, screen_pt) {
                    *provisional
                } else {
                    Some(drawn_bbox(&self.viewport, *tool, *anchor, screen_pt))
                };
                vec![Action::RenderNeeded]
            }
            InputState::DraggingElement { id, start_screen, start_bbox } => {
                let delta = self.viewport.screen_to_page(Point::new(screen_pt.x - start_screen.x, screen_pt.y - start_screen.y));
                self.doc.set_bbox(id, start_bbox.translated(delta.x, delta.y));
                vec![Action::RenderNeeded]
            }
            InputState::Resizing { id, handle, start_screen, start_bbox } => {
                let square = self.doc.get(id).is_some_and(Element::is_checkbox);
                let delta = Point::new(screen_pt.x - start_screen.x, screen_pt.y - start_screen.y);
                let bbox = resized_bbox(start_bbox, *handle, delta, &self.viewport, square);
                self.doc.set_bbox(id, bbox);
                vec![Action::RenderNeeded]
            }
            InputState::PendingMetadata { .. } => Vec::new(),
        }
    }

    fn hover_cursor(&self, screen_pt: Point) -> &'static str {
        if self.ui.tool.is_creation() {
            return "crosshair";
        }
        let hit = hit::hit_test(&self.doc, self.ui.page, &self.viewport, screen_pt, self.ui.selected_id.as_ref());
        match hit.map(|h| h.part) {
            Some(HitPart::Handle(handle)) => handle.cursor(),
            Some(HitPart::Body) => "move",
            None => "default",
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        match &self.input {
            InputState::DraggingElement { .. } | InputState::Resizing { .. } => {
                self.on_pointer_move(screen_pt);
                match std::mem::take(&mut self.input) {
                    InputState::DraggingElement { id, start_bbox, .. } | InputState::Resizing { id, start_bbox, .. } => {
                        self.commit_manipulation(&id, start_bbox)
                    }
                    other => {
                        self.input = other;
                        Vec::new()
                    }
                }
            }
            InputState::Drawing { .. } => match std::mem::take(&mut self.input) {
                InputState::Drawing { tool, anchor, provisional, .. } => self.finish_drawing(tool, anchor, screen_pt, provisional),
                other => {
                    self.input = other;
                    Vec::new()
                }
            },
            InputState::Idle | InputState::PendingMetadata { .. } => Vec::new(),
        }
    }

    fn commit_manipulation(&mut self, id: &ElementId, start_bbox: BoundingBox) -> Vec<Action> {
        let mut actions = vec![Action::ReleasePointer];
        if let Some(element) = self.doc.get_mut(id) {
            if element.is_checkbox() {
                element.bbox = element.bbox.squared(MIN_CHECKBOX_PT);
            }
            if element.bbox != start_bbox {
                log::debug!("committed bbox of {id}");
                actions.push(Action::ElementUpdated(element.clone()));
            }
        }
        actions.push(Action::SetCursor("default".to_owned()));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn finish_drawing(&mut self, tool: Tool, anchor: Point, end: Point, provisional: Option<BoundingBox>) -> Vec<Action> {
        let large_enough = exceeds_min_gesture(anchor, end);
        let drawn = drawn_bbox(&self.viewport, tool, anchor, end);
        let page = self.ui.page;
        match tool {
            Tool::Text if large_enough => {
                self.input = InputState::PendingMetadata { element: Element::text(page, drawn, "") };
                vec![Action::DataPathRequested, Action::RenderNeeded]
            }
            Tool::Checkbox if large_enough => {
                let element = Element::checkbox(page, drawn.squared(MIN_CHECKBOX_PT), CHECKBOX_DATA_PATH);
                log::debug!("created checkbox {}", element.id);
                self.doc.push(element.clone());
                vec![Action::ElementCreated(element), Action::RenderNeeded]
            }
            Tool::Image => {
                let bbox = if large_enough { Some(drawn) } else { provisional };
                match bbox {
                    Some(bbox) => {
                        self.input = InputState::PendingMetadata { element: Element::image(page, bbox, "") };
                        vec![Action::ImageRequested, Action::RenderNeeded]
                    }
                    None => vec![Action::RenderNeeded],
                }
            }
            _ => {
                log::debug!("discarded {tool:?} gesture below the size threshold");
                vec![Action::RenderNeeded]
            }
        }
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key) -> Vec<Action> {
        if key.is_escape() {
            return match self.input {
                InputState::Idle => Vec::new(),
                InputState::PendingMetadata { .. } => self.cancel_metadata(),
                _ => {
                    let mut actions = self.abandon_gesture();
                    actions.push(Action::RenderNeeded);
                    actions
                }
            };
        }
        if key.is_delete() && self.input.is_idle() {
            return self.delete_selected();
        }
        Vec::new()
    }

    // --- Metadata step ---

    /// Complete a pending text element with its data path. An empty path aborts creation.
    pub fn submit_data_path(&mut self, data_path: &str) -> Vec<Action> {
        let InputState::PendingMetadata { element } = &self.input else {
            return Vec::new();
        };
        if !matches!(element.kind, ElementKind::Text { .. }) {
            return Vec::new();
        }
        let InputState::PendingMetadata { mut element } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        let data_path = data_path.trim();
        if data_path.is_empty() {
            log::debug!("empty data path, discarding {}", element.id);
            return vec![Action::RenderNeeded];
        }
        element.data_path = data_path.to_owned();
        self.doc.push(element.clone());
        vec![Action::ElementCreated(element), Action::RenderNeeded]
    }

    /// Complete a pending image element with its stored path and pixel size.
    ///
    /// The provisional bbox is rescaled to the image's aspect ratio, keeping its
    /// larger side and its top-left corner.
    pub fn submit_image(&mut self, image_path: &str, width: f64, height: f64) -> Vec<Action> {
        let InputState::PendingMetadata { element } = &self.input else {
            return Vec::new();
        };
        if !matches!(element.kind, ElementKind::Image { .. }) {
            return Vec::new();
        }
        let InputState::PendingMetadata { mut element } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        element.bbox = element.bbox.fit_aspect(width, height);
        element.kind = ElementKind::Image { image_path: image_path.to_owned() };
        self.doc.push(element.clone());
        vec![Action::ElementCreated(element), Action::RenderNeeded]
    }

    /// Discard the pending element, if any.
    pub fn cancel_metadata(&mut self) -> Vec<Action> {
        if !matches!(self.input, InputState::PendingMetadata { .. }) {
            return Vec::new();
        }
        self.input = InputState::Idle;
        vec![Action::RenderNeeded]
    }

    // --- Deletion ---

    /// Remove the selected element and clear the selection.
    ///
    /// A drag or resize in progress is dropped first. Does nothing while a
    /// new element waits for its metadata.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        if matches!(self.input, InputState::PendingMetadata { .. }) {
            return Vec::new();
        }
        let Some(id) = self.ui.selected_id.take() else {
            return Vec::new();
        };
        let mut actions = self.abandon_gesture();
        if let Some(removed) = self.doc.remove(&id) {
            actions.push(Action::ElementDeleted { id: removed.id });
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Images ---

    /// Mark every unseen image on the current page as loading and ask the host to load it.
    pub fn request_images<H>(&self, cache: &mut ImageCache<H>) -> Vec<Action> {
        let mut actions = Vec::new();
        for element in self.doc.on_page(self.ui.page) {
            if let ElementKind::Image { image_path } = &element.kind {
                if cache.request(image_path) {
                    actions.push(Action::LoadImage { path: image_path.clone() });
                }
            }
        }
        actions
    }

    // --- Queries ---

    /// The currently selected element, resolved against the store.
    #[must_use]
    pub fn selection(&self) -> Option<&Element> {
        self.ui.selected_id.as_ref().and_then(|id| self.doc.get(id))
    }

    /// The dashed in-progress bbox: the drawing preview or the pending element.
    #[must_use]
    pub fn transient_bbox(&self) -> Option<BoundingBox> {
        match &self.input {
            InputState::Drawing { preview, .. } => *preview,
            InputState::PendingMetadata { element } => Some(element.bbox),
            _ => None,
        }
    }

    /// The provisional element waiting for metadata, if any.
    #[must_use]
    pub fn pending_element(&self) -> Option<&Element> {
        match &self.input {
            InputState::PendingMetadata { element } => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.doc.as_slice()
    }

    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.ui.page
    }

    // --- Internals ---

    /// Drop the current gesture. Drags and resizes revert to their snapshot.
    fn abandon_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::DraggingElement { id, start_bbox, .. } | InputState::Resizing { id, start_bbox, .. } => {
                self.doc.set_bbox(&id, start_bbox);
                log::debug!("reverted gesture on {id}");
                vec![Action::ReleasePointer]
            }
            InputState::Drawing { .. } | InputState::PendingMetadata { .. } => {
                log::debug!("abandoned creation gesture");
                Vec::new()
            }
            InputState::Idle => Vec::new(),
        }
    }
}

/// Both screen extents of the gesture exceed the minimum.
fn exceeds_min_gesture(anchor: Point, current: Point) -> bool {
    (current.x - anchor.x).abs() > MIN_GESTURE_PX && (current.y - anchor.y).abs() > MIN_GESTURE_PX
}

/// Normalized page-unit bbox spanned by a drawing gesture. Checkboxes are
/// squared from the anchor, growing toward the pointer.
fn drawn_bbox(viewport: &Viewport, tool: Tool, anchor: Point, current: Point) -> BoundingBox {
    let start = viewport.screen_to_page(anchor);
    let end = viewport.screen_to_page(current);
    if tool != Tool::Checkbox {
        return BoundingBox::from_corners(start, end);
    }
    let side = (end.x - start.x).abs().max((end.y - start.y).abs());
    let x = if end.x < start.x { start.x - side } else { start.x };
    let y = if end.y < start.y { start.y - side } else { start.y };
    BoundingBox::new(x, y, side, side)
}

/// Move the two edges owned by `handle` by `delta` screen pixels, keeping the
/// opposite corner fixed and each side at least `MIN_GESTURE_PX` on screen.
fn resized_bbox(start: &BoundingBox, handle: Handle, delta: Point, viewport: &Viewport, square: bool) -> BoundingBox {
    let tl = viewport.page_to_screen(Point::new(start.x, start.y));
    let br = viewport.page_to_screen(Point::new(start.x + start.w, start.y + start.h));
    let (mut left, mut top, mut right, mut bottom) = (tl.x, tl.y, br.x, br.y);
    match handle {
        Handle::Nw | Handle::Sw => left = (left + delta.x).min(right - MIN_GESTURE_PX),
        Handle::Ne | Handle::Se => right = (right + delta.x).max(left + MIN_GESTURE_PX),
    }
    match handle {
        Handle::Nw | Handle::Ne => top = (top + delta.y).min(bottom - MIN_GESTURE_PX),
        Handle::Sw | Handle::Se => bottom = (bottom + delta.y).max(top + MIN_GESTURE_PX),
    }
    let bbox = BoundingBox::from_corners(viewport.screen_to_page(Point::new(left, top)), viewport.screen_to_page(Point::new(right, bottom)));
    if !square {
        return bbox;
    }
    let side = bbox.w.max(bbox.h);
    let x = match handle {
        Handle::Nw | Handle::Sw => bbox.x + bbox.w - side,
        Handle::Ne | Handle::Se => bbox.x,
    };
    let y = match handle {
        Handle::Nw | Handle::Ne => bbox.y + bbox.h - side,
        Handle::Sw | Handle::Se => bbox.y,
    };
    BoundingBox::new(x, y, side, side)
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: ImageCache<HtmlImageElement>,
    dpr: f64,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        Ok(Self { canvas, ctx, images: ImageCache::new(), dpr: 1.0, core: EngineCore::new() })
    }

    // --- Delegated data inputs ---

    pub fn load_elements(&mut self, elements: Vec<Element>) -> Vec<Action> {
        self.core.load_elements(elements);
        self.with_image_requests(vec![Action::RenderNeeded])
    }

    pub fn set_page_size(&mut self, page: PageSize) {
        self.core.set_page_size(page);
    }

    pub fn update_element(&mut self, id: &ElementId, patch: &ElementPatch) -> Vec<Action> {
        let actions = self.core.update_element(id, patch);
        self.with_image_requests(actions)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    pub fn set_page(&mut self, page: u32) -> Vec<Action> {
        let actions = self.core.set_page(page);
        self.with_image_requests(actions)
    }

    // --- Viewport ---

    /// Update the page raster's CSS size and the device pixel ratio, resizing the backing store.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css);
        if dpr.is_finite() && dpr > 0.0 {
            self.dpr = dpr;
        }
        self.canvas.set_width((self.core.viewport.display_width * self.dpr).round() as u32);
        self.canvas.set_height((self.core.viewport.display_height * self.dpr).round() as u32);
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button)
    }

    pub fn on_key_down(&mut self, key: &Key) -> Vec<Action> {
        self.core.on_key_down(key)
    }

    pub fn submit_data_path(&mut self, data_path: &str) -> Vec<Action> {
        self.core.submit_data_path(data_path)
    }

    pub fn submit_image(&mut self, image_path: &str, width: f64, height: f64) -> Vec<Action> {
        let actions = self.core.submit_image(image_path, width, height);
        self.with_image_requests(actions)
    }

    pub fn cancel_metadata(&mut self) -> Vec<Action> {
        self.core.cancel_metadata()
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        self.core.delete_selected()
    }

    // --- Image loading ---

    /// The host finished loading `path`.
    pub fn image_loaded(&mut self, path: &str, image: HtmlImageElement) -> Vec<Action> {
        self.images.resolve(path, image);
        vec![Action::RenderNeeded]
    }

    /// The host failed to load `path`; a placeholder is drawn instead.
    pub fn image_failed(&mut self, path: &str) -> Vec<Action> {
        self.images.fail(path);
        vec![Action::RenderNeeded]
    }

    fn with_image_requests(&mut self, mut actions: Vec<Action>) -> Vec<Action> {
        actions.extend(self.core.request_images(&mut self.images));
        actions
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let mut surface = Canvas2d::new(&self.ctx, self.dpr);
        render::draw(&mut surface, &self.core, &self.images)
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<&Element> {
        self.core.selection()
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.core.elements()
    }
}
