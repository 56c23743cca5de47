//! [`Surface`] backed by a browser `CanvasRenderingContext2d`.
//!
//! This is the only module that touches the 2D context. Fallible context calls
//! propagate their `JsValue` error to the caller of the render pass.

use js_sys::Array;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::doc::BoundingBox;
use crate::render::{Stroke, Surface};
use crate::transform::Point;

pub struct Canvas2d<'a> {
    ctx: &'a CanvasRenderingContext2d,
    dpr: f64,
}

impl<'a> Canvas2d<'a> {
    #[must_use]
    pub fn new(ctx: &'a CanvasRenderingContext2d, dpr: f64) -> Self {
        Self { ctx, dpr }
    }

    fn apply_stroke(&self, stroke: &Stroke<'_>) -> Result<(), JsValue> {
        self.ctx.set_stroke_style_str(stroke.color);
        self.ctx.set_line_width(stroke.width);
        let dash = stroke.dash.iter().map(|d| JsValue::from_f64(*d)).collect::<Array>();
        self.ctx.set_line_dash(&dash)
    }
}

impl Surface for Canvas2d<'_> {
    type Image = HtmlImageElement;
    type Error = JsValue;

    fn clear(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0)?;
        self.ctx.clear_rect(0.0, 0.0, width, height);
        Ok(())
    }

    fn fill_rect(&mut self, rect: BoundingBox, color: &str) -> Result<(), JsValue> {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
        Ok(())
    }

    fn stroke_rect(&mut self, rect: BoundingBox, stroke: &Stroke<'_>) -> Result<(), JsValue> {
        self.apply_stroke(stroke)?;
        self.ctx.stroke_rect(rect.x, rect.y, rect.w, rect.h);
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Point], stroke: &Stroke<'_>) -> Result<(), JsValue> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.apply_stroke(stroke)?;
        self.ctx.begin_path();
        self.ctx.move_to(first.x, first.y);
        for p in rest {
            self.ctx.line_to(p.x, p.y);
        }
        self.ctx.stroke();
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, font: &str, color: &str) -> Result<(), JsValue> {
        self.ctx.set_font(font);
        self.ctx.set_text_baseline("alphabetic");
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_text(text, at.x, at.y)
    }

    fn measure_text(&mut self, text: &str, font: &str) -> Result<f64, JsValue> {
        self.ctx.set_font(font);
        Ok(self.ctx.measure_text(text)?.width())
    }

    fn draw_image(&mut self, image: &HtmlImageElement, rect: BoundingBox) -> Result<(), JsValue> {
        self.ctx.draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.w, rect.h)
    }
}
