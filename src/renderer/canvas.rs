//! Browser 2D canvas sink

use std::f64::consts::TAU;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::palette::{self, colors};
use super::{DrawStyle, Frame, RenderSink, draw_list};
use crate::Bounds;
use crate::error::{Result, SimError};

fn js_err(e: JsValue) -> SimError {
    SimError::Render(format!("{:?}", e))
}

pub struct CanvasSink {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    style: DrawStyle,
    bounds: Bounds,
    /// Draw the time and control value in the corner
    pub show_hud: bool,
}

impl CanvasSink {
    pub fn new(canvas: HtmlCanvasElement, style: DrawStyle, bounds: Bounds) -> Result<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(js_err)?
            .ok_or_else(|| SimError::Render("2d context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SimError::Render("not a 2d context".into()))?;
        Ok(Self {
            canvas,
            ctx,
            style,
            bounds,
            show_hud: true,
        })
    }

    pub fn set_style(&mut self, style: DrawStyle) {
        self.style = style;
    }

    /// Scale and offset that fit the face into the canvas, centred
    fn fit(&self) -> (f64, f64, f64) {
        let cw = self.canvas.width() as f64;
        let ch = self.canvas.height() as f64;
        let fw = self.bounds.width as f64;
        let fh = self.bounds.height as f64;
        let scale = (cw / fw).min(ch / fh);
        (scale, (cw - fw * scale) / 2.0, (ch - fh * scale) / 2.0)
    }
}

impl RenderSink for CanvasSink {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        let ctx = &self.ctx;
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).map_err(js_err)?;
        ctx.set_fill_style_str(&palette::css_rgba(colors::BACKGROUND));
        ctx.fill_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);

        let (scale, ox, oy) = self.fit();
        ctx.set_transform(scale, 0.0, 0.0, scale, ox, oy).map_err(js_err)?;

        for dot in draw_list(&frame.particles, &frame.sparks, &self.style) {
            if dot.color[3] <= 0.0 || dot.radius <= 0.0 {
                continue;
            }
            ctx.set_fill_style_str(&palette::css_rgba(dot.color));
            ctx.begin_path();
            ctx.arc(dot.pos.x as f64, dot.pos.y as f64, dot.radius as f64, 0.0, TAU)
                .map_err(js_err)?;
            ctx.fill();
        }

        if self.show_hud {
            ctx.set_fill_style_str(&palette::css_rgba(colors::IDLE));
            ctx.set_font("12px monospace");
            let time = frame
                .time
                .map(|t| t.to_string())
                .unwrap_or_else(|| "--:--:--".into());
            ctx.fill_text(&format!("{}  speed {:.3}", time, frame.control), 8.0, 16.0)
                .map_err(js_err)?;
        }
        Ok(())
    }

    fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }
}
