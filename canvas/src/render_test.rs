#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::ElementId;
use crate::input::{Button, InputState};
use crate::transform::PageSize;

// =============================================================
// Recording surface
// =============================================================

#[derive(Debug, Clone, PartialEq)]
enum Cmd {
    Clear,
    FillRect { rect: BoundingBox, color: String },
    StrokeRect { rect: BoundingBox, color: String, dashed: bool },
    Polyline { points: usize },
    Text { text: String, at: Point, font: String },
    Image { id: u32, rect: BoundingBox },
}

struct Recorder {
    cmds: Vec<Cmd>,
    /// Pixels per character reported by `measure_text`.
    char_width: f64,
}

impl Recorder {
    fn new() -> Self {
        Self { cmds: Vec::new(), char_width: 6.0 }
    }

    fn texts(&self) -> Vec<&str> {
        self.cmds
            .iter()
            .filter_map(|c| match c {
                Cmd::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn dashed_rects(&self) -> Vec<BoundingBox> {
        self.cmds
            .iter()
            .filter_map(|c| match c {
                Cmd::StrokeRect { rect, dashed: true, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    fn count_fill(&self, color: &str) -> usize {
        self.cmds.iter().filter(|c| matches!(c, Cmd::FillRect { color: col, .. } if col == color)).count()
    }

    fn count_stroke(&self, color: &str) -> usize {
        self.cmds.iter().filter(|c| matches!(c, Cmd::StrokeRect { color: col, .. } if col == color)).count()
    }
}

impl Surface for Recorder {
    type Image = u32;
    type Error = String;

    fn clear(&mut self, _width: f64, _height: f64) -> Result<(), String> {
        self.cmds.push(Cmd::Clear);
        Ok(())
    }

    fn fill_rect(&mut self, rect: BoundingBox, color: &str) -> Result<(), String> {
        self.cmds.push(Cmd::FillRect { rect, color: color.to_owned() });
        Ok(())
    }

    fn stroke_rect(&mut self, rect: BoundingBox, stroke: &Stroke<'_>) -> Result<(), String> {
        self.cmds.push(Cmd::StrokeRect { rect, color: stroke.color.to_owned(), dashed: !stroke.dash.is_empty() });
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Point], _stroke: &Stroke<'_>) -> Result<(), String> {
        self.cmds.push(Cmd::Polyline { points: points.len() });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, font: &str, _color: &str) -> Result<(), String> {
        self.cmds.push(Cmd::Text { text: text.to_owned(), at, font: font.to_owned() });
        Ok(())
    }

    fn measure_text(&mut self, text: &str, _font: &str) -> Result<f64, String> {
        #[allow(clippy::cast_precision_loss)]
        let width = text.chars().count() as f64 * self.char_width;
        Ok(width)
    }

    fn draw_image(&mut self, image: &u32, rect: BoundingBox) -> Result<(), String> {
        self.cmds.push(Cmd::Image { id: *image, rect });
        Ok(())
    }
}

struct FailingSurface;

impl Surface for FailingSurface {
    type Image = u32;
    type Error = &'static str;

    fn clear(&mut self, _: f64, _: f64) -> Result<(), &'static str> {
        Ok(())
    }
    fn fill_rect(&mut self, _: BoundingBox, _: &str) -> Result<(), &'static str> {
        Ok(())
    }
    fn stroke_rect(&mut self, _: BoundingBox, _: &Stroke<'_>) -> Result<(), &'static str> {
        Err("context lost")
    }
    fn stroke_polyline(&mut self, _: &[Point], _: &Stroke<'_>) -> Result<(), &'static str> {
        Ok(())
    }
    fn fill_text(&mut self, _: &str, _: Point, _: &str, _: &str) -> Result<(), &'static str> {
        Ok(())
    }
    fn measure_text(&mut self, _: &str, _: &str) -> Result<f64, &'static str> {
        Ok(0.0)
    }
    fn draw_image(&mut self, _: &u32, _: BoundingBox) -> Result<(), &'static str> {
        Ok(())
    }
}

// =============================================================
// Helpers
// =============================================================

fn core_with(elements: Vec<Element>) -> EngineCore {
    let mut core = EngineCore::new();
    core.load_elements(elements);
    core
}

fn bbox(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
    BoundingBox::new(x, y, w, h)
}

fn render(core: &EngineCore, images: &ImageCache<u32>) -> Recorder {
    let mut rec = Recorder::new();
    draw(&mut rec, core, images).unwrap();
    rec
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =============================================================
// layout_text
// =============================================================

fn style(align: TextAlign, vertical: VerticalAlign) -> TextStyle {
    TextStyle { size: 10.0, align, vertical_align: vertical, ..TextStyle::default() }
}

#[test]
fn layout_top_left() {
    let layout = layout_text(&bbox(100.0, 200.0, 80.0, 30.0), &style(TextAlign::Left, VerticalAlign::Top), 40.0);
    assert!(approx(layout.origin.x, 105.0));
    assert!(approx(layout.origin.y, 213.0));
    assert!(layout.underline.is_none());
    assert!(layout.strikethrough.is_none());
}

#[test]
fn layout_middle_center() {
    let layout = layout_text(&bbox(100.0, 200.0, 80.0, 30.0), &style(TextAlign::Center, VerticalAlign::Middle), 40.0);
    assert!(approx(layout.origin.x, 120.0));
    assert!(approx(layout.origin.y, 218.0));
}

#[test]
fn layout_bottom_right() {
    let layout = layout_text(&bbox(100.0, 200.0, 80.0, 30.0), &style(TextAlign::Right, VerticalAlign::Bottom), 40.0);
    assert!(approx(layout.origin.x, 135.0));
    assert!(approx(layout.origin.y, 223.0));
}

#[test]
fn layout_decorations() {
    let mut s = style(TextAlign::Left, VerticalAlign::Top);
    s.underline = true;
    s.strikethrough = true;
    let layout = layout_text(&bbox(0.0, 0.0, 100.0, 20.0), &s, 30.0);
    let underline = layout.underline.unwrap();
    let strike = layout.strikethrough.unwrap();
    assert!(approx(underline.y, layout.origin.y + 2.0));
    assert!(approx(strike.y, layout.origin.y - 3.0));
    assert_eq!(underline.width, 30.0);
    assert!(approx(underline.thickness, 0.5));
}

#[test]
fn layout_thick_decoration_for_large_text() {
    let s = TextStyle { size: 40.0, underline: true, ..TextStyle::default() };
    let layout = layout_text(&bbox(0.0, 0.0, 300.0, 60.0), &s, 100.0);
    assert!(approx(layout.underline.unwrap().thickness, 2.0));
}

#[test]
fn font_css_bold_and_family() {
    let mut s = TextStyle::default();
    assert_eq!(font_css(&s, 12.0), "12px Helvetica, Arial, sans-serif");
    s.weight = FontWeight::Bold;
    s.font = Some("NotoSansKR".into());
    assert_eq!(font_css(&s, 20.5), "bold 20.5px NotoSansKR");
}

// =============================================================
// draw: elements
// =============================================================

#[test]
fn draw_starts_with_clear() {
    let rec = render(&EngineCore::new(), &ImageCache::new());
    assert_eq!(rec.cmds, vec![Cmd::Clear]);
}

#[test]
fn draw_only_current_page() {
    let core = core_with(vec![
        Element::text(1, bbox(10.0, 10.0, 50.0, 20.0), "on.one"),
        Element::text(2, bbox(10.0, 10.0, 50.0, 20.0), "on.two"),
    ]);
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.texts(), vec!["on.one"]);
}

#[test]
fn draw_text_label_uses_data_path() {
    let core = core_with(vec![Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "customer.name")]);
    let rec = render(&core, &ImageCache::new());
    let Some(Cmd::Text { text, at, font }) = rec.cmds.iter().find(|c| matches!(c, Cmd::Text { .. })) else {
        panic!("no text drawn");
    };
    assert_eq!(text, "customer.name");
    assert!((at.x - 15.0).abs() < 1e-6);
    assert!((at.y - 23.0).abs() < 1e-6);
    assert!(font.contains("px"));
}

#[test]
fn draw_text_without_data_path_has_no_label() {
    let core = core_with(vec![Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "")]);
    let rec = render(&core, &ImageCache::new());
    assert!(rec.texts().is_empty());
    assert_eq!(rec.count_stroke(ELEMENT_STROKE), 1);
}

#[test]
fn draw_text_background_fill() {
    let mut el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a");
    if let ElementKind::Text { style } = &mut el.kind {
        style.background_color = Some("#ffff00".into());
    }
    let core = core_with(vec![el]);
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.count_fill("#ffff00"), 1);
}

#[test]
fn draw_transparent_background_is_skipped() {
    let mut el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a");
    if let ElementKind::Text { style } = &mut el.kind {
        style.background_color = Some("transparent".into());
    }
    let core = core_with(vec![el]);
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.count_fill("transparent"), 0);
}

#[test]
fn draw_underline_as_bar() {
    let mut el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "abc");
    if let ElementKind::Text { style } = &mut el.kind {
        style.underline = true;
        style.color = "#123456".into();
    }
    let core = core_with(vec![el]);
    let rec = render(&core, &ImageCache::new());
    let bars: Vec<_> = rec
        .cmds
        .iter()
        .filter_map(|c| match c {
            Cmd::FillRect { rect, color } if color == "#123456" => Some(*rect),
            _ => None,
        })
        .collect();
    assert_eq!(bars.len(), 1);
    assert!((bars[0].w - 18.0).abs() < 1e-9);
}

#[test]
fn draw_checkbox_mark_only_when_bound() {
    let core = core_with(vec![
        Element::checkbox(1, bbox(10.0, 10.0, 20.0, 20.0), "checked"),
        Element::checkbox(1, bbox(50.0, 10.0, 20.0, 20.0), ""),
    ]);
    let rec = render(&core, &ImageCache::new());
    let marks = rec.cmds.iter().filter(|c| matches!(c, Cmd::Polyline { points: 3 })).count();
    assert_eq!(marks, 1);
    assert_eq!(rec.count_stroke(ELEMENT_STROKE), 2);
}

#[test]
fn draw_image_states() {
    let core = core_with(vec![
        Element::image(1, bbox(0.0, 0.0, 10.0, 10.0), "ready.png"),
        Element::image(1, bbox(20.0, 0.0, 10.0, 10.0), "loading.png"),
        Element::image(1, bbox(40.0, 0.0, 10.0, 10.0), "failed.png"),
        Element::image(1, bbox(60.0, 0.0, 10.0, 10.0), "absent.png"),
    ]);
    let mut images = ImageCache::new();
    images.resolve("ready.png", 42);
    images.request("loading.png");
    images.fail("failed.png");
    let rec = render(&core, &images);
    assert!(rec.cmds.iter().any(|c| matches!(c, Cmd::Image { id: 42, .. })));
    assert_eq!(rec.texts(), vec!["Loading image", "Image unavailable", "Image"]);
    assert_eq!(rec.count_fill(FAILED_FILL), 1);
    assert_eq!(rec.count_fill(PLACEHOLDER_FILL), 2);
}

#[test]
fn draw_scales_to_display() {
    let mut core = core_with(vec![Element::checkbox(1, bbox(100.0, 100.0, 10.0, 10.0), "")]);
    core.set_viewport(PageSize::A4.width * 2.0, PageSize::A4.height * 2.0);
    let rec = render(&core, &ImageCache::new());
    let Some(Cmd::StrokeRect { rect, .. }) = rec.cmds.iter().find(|c| matches!(c, Cmd::StrokeRect { .. })) else {
        panic!("no outline drawn");
    };
    assert!((rect.x - 200.0).abs() < 1e-6);
    assert!((rect.w - 20.0).abs() < 1e-6);
}

// =============================================================
// draw: selection and gesture feedback
// =============================================================

#[test]
fn draw_selected_element_highlighted_with_handles() {
    let el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a");
    let id = el.id.clone();
    let mut core = core_with(vec![el]);
    core.ui.selected_id = Some(id);
    let rec = render(&core, &ImageCache::new());
    // One element outline plus four handle outlines.
    assert_eq!(rec.count_stroke(SELECTED_STROKE), 5);
    assert_eq!(rec.count_fill(HANDLE_FILL), 4);
}

#[test]
fn draw_selected_repeat_is_outline_only() {
    let el: Element = serde_json::from_value(serde_json::json!({
        "id": "rows", "type": "repeat", "page": 1,
        "bbox": {"x": 10.0, "y": 10.0, "w": 200.0, "h": 80.0},
        "items_path": "items"
    }))
    .unwrap();
    let mut core = core_with(vec![el]);
    core.ui.selected_id = Some(ElementId::from("rows"));
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.count_stroke(SELECTED_STROKE), 1);
    assert_eq!(rec.count_fill(HANDLE_FILL), 0);
    assert!(rec.texts().is_empty());
}

#[test]
fn draw_no_handles_with_creation_tool() {
    let el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a");
    let id = el.id.clone();
    let mut core = core_with(vec![el]);
    core.ui.selected_id = Some(id);
    core.ui.tool = Tool::Text;
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.count_fill(HANDLE_FILL), 0);
}

#[test]
fn draw_stale_selection_draws_no_handles() {
    let mut core = core_with(vec![Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a")]);
    core.ui.selected_id = Some(ElementId::from("missing"));
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.count_fill(HANDLE_FILL), 0);
    assert_eq!(rec.count_stroke(SELECTED_STROKE), 0);
}

#[test]
fn draw_dashed_preview_while_drawing() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Text);
    core.on_pointer_down(Point::new(100.0, 100.0), Button::Primary);
    core.on_pointer_move(Point::new(200.0, 150.0));
    let rec = render(&core, &ImageCache::new());
    let dashed = rec.dashed_rects();
    assert_eq!(dashed.len(), 1);
    assert!((dashed[0].w - 100.0).abs() < 1e-6);
    assert!((dashed[0].h - 50.0).abs() < 1e-6);
}

#[test]
fn draw_dashed_pending_element() {
    let mut core = EngineCore::new();
    core.input = InputState::PendingMetadata { element: Element::image(1, bbox(0.0, 0.0, 100.0, 100.0), "") };
    let rec = render(&core, &ImageCache::new());
    assert_eq!(rec.dashed_rects().len(), 1);
}

#[test]
fn draw_is_idempotent() {
    let el = Element::text(1, bbox(10.0, 10.0, 100.0, 20.0), "a.b");
    let id = el.id.clone();
    let mut core = core_with(vec![el, Element::checkbox(1, bbox(200.0, 10.0, 20.0, 20.0), "checked")]);
    core.ui.selected_id = Some(id);
    let images = ImageCache::new();
    let first = render(&core, &images);
    let second = render(&core, &images);
    assert_eq!(first.cmds, second.cmds);
}

#[test]
fn draw_propagates_surface_errors() {
    let core = core_with(vec![Element::checkbox(1, bbox(0.0, 0.0, 10.0, 10.0), "")]);
    let result = draw(&mut FailingSurface, &core, &ImageCache::new());
    assert_eq!(result, Err("context lost"));
}
