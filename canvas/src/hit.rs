//! Hit-testing against the current page's elements.
//!
//! Element bodies are tested in page units; corner handles are tested in
//! screen space so their grab radius does not change with zoom.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::HANDLE_TOLERANCE_PX;
use crate::doc::{BoundingBox, Element, ElementId, ElementStore};
use crate::transform::{Point, Viewport};

/// Corner grip of the selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Handle {
    /// All handles in hit-test priority order.
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Sw, Self::Se];

    /// CSS cursor hinting the resize direction.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Nw | Self::Se => "nwse-resize",
            Self::Ne | Self::Sw => "nesw-resize",
        }
    }
}

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Handle(Handle),
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub id: ElementId,
    pub part: HitPart,
}

/// Screen-space corners of `bbox` in [`Handle::ALL`] order.
#[must_use]
pub fn handle_positions(bbox: &BoundingBox, viewport: &Viewport) -> [Point; 4] {
    let tl = viewport.page_to_screen(Point::new(bbox.x, bbox.y));
    let br = viewport.page_to_screen(Point::new(bbox.x + bbox.w, bbox.y + bbox.h));
    [Point::new(tl.x, tl.y), Point::new(br.x, tl.y), Point::new(tl.x, br.y), Point::new(br.x, br.y)]
}

/// The topmost element on `page` containing `screen_pt`.
///
/// Later elements in storage order win on overlap.
#[must_use]
pub fn element_at<'a>(store: &'a ElementStore, page: u32, viewport: &Viewport, screen_pt: Point) -> Option<&'a Element> {
    let page_pt = viewport.screen_to_page(screen_pt);
    store.on_page(page).rev().find(|e| e.bbox.contains(page_pt))
}

/// The corner handle of `element` within grab distance of `screen_pt`.
///
/// Corners are checked independently in `nw, ne, sw, se` order; on tiny boxes
/// several may be in range and the first one wins. Elements that are not
/// resizable have no handles.
#[must_use]
pub fn resize_handle_at(element: &Element, viewport: &Viewport, screen_pt: Point) -> Option<Handle> {
    if !element.is_resizable() {
        return None;
    }
    let corners = handle_positions(&element.bbox, viewport);
    Handle::ALL
        .into_iter()
        .zip(corners)
        .find(|(_, corner)| {
            (screen_pt.x - corner.x).abs() <= HANDLE_TOLERANCE_PX && (screen_pt.y - corner.y).abs() <= HANDLE_TOLERANCE_PX
        })
        .map(|(handle, _)| handle)
}

/// Test what is under `screen_pt`, checking the selected element's handles first.
#[must_use]
pub fn hit_test(
    store: &ElementStore,
    page: u32,
    viewport: &Viewport,
    screen_pt: Point,
    selected_id: Option<&ElementId>,
) -> Option<Hit> {
    if let Some(selected) = selected_id.and_then(|id| store.get(id)) {
        if selected.page == page {
            if let Some(handle) = resize_handle_at(selected, viewport, screen_pt) {
                return Some(Hit { id: selected.id.clone(), part: HitPart::Handle(handle) });
            }
        }
    }
    element_at(store, page, viewport, screen_pt).map(|e| Hit { id: e.id.clone(), part: HitPart::Body })
}
