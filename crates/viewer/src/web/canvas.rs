use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use warpfield::StatusSurface;

const LINE_HEIGHT: f64 = 18.0;
const MARGIN: f64 = 12.0;

/// Fallback readout painted with the 2D canvas API.
///
/// A canvas that already holds a GL context cannot hand out a 2D one. The
/// canvas is then swapped for a fresh element with the same id, size and
/// classes, and the readout is painted there.
pub struct CanvasStatus {
    canvas: HtmlCanvasElement,
}

impl CanvasStatus {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas }
    }

    /// The canvas currently showing the readout.
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
        canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
    }

    /// A 2D context, replacing the canvas in the page if it is GL-bound.
    fn claim_2d(&mut self) -> Result<CanvasRenderingContext2d, JsValue> {
        if let Some(ctx) = Self::context_2d(&self.canvas) {
            return Ok(ctx);
        }
        let fresh = replacement_canvas(&self.canvas)?;
        self.canvas.replace_with_with_node_1(&fresh)?;
        log::info!("readout moved to a fresh canvas '{}'", fresh.id());
        self.canvas = fresh;
        Self::context_2d(&self.canvas).ok_or_else(|| JsValue::from_str("fresh canvas has no 2d context"))
    }
}

fn replacement_canvas(old: &HtmlCanvasElement) -> Result<HtmlCanvasElement, JsValue> {
    let document = old
        .owner_document()
        .ok_or_else(|| JsValue::from_str("canvas is not in a document"))?;
    let fresh = document.create_element("canvas")?.dyn_into::<HtmlCanvasElement>()?;
    fresh.set_id(&old.id());
    fresh.set_class_name(&old.class_name());
    if let Some(style) = old.get_attribute("style") {
        fresh.set_attribute("style", &style)?;
    }
    fresh.set_width(old.width());
    fresh.set_height(old.height());
    Ok(fresh)
}

impl StatusSurface for CanvasStatus {
    fn show_status(&mut self, lines: &[String]) {
        let ctx = match self.claim_2d() {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("no 2d readout: {:?}", e);
                for line in lines {
                    log::warn!("{}", line);
                }
                return;
            }
        };
        let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
        ctx.set_fill_style_str("#05050d");
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_font("13px monospace");
        ctx.set_fill_style_str("#9fd3ff");
        for (i, line) in lines.iter().enumerate() {
            let y = MARGIN + LINE_HEIGHT * (i as f64 + 1.0);
            if ctx.fill_text(line, MARGIN, y).is_err() {
                break;
            }
        }
    }
}

/// Match the canvas backing store to its CSS size. Returns true when the
/// size changed.
pub fn fit_to_display(canvas: &HtmlCanvasElement) -> bool {
    let ratio = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
    let width = (canvas.client_width() as f64 * ratio).round().max(1.0) as u32;
    let height = (canvas.client_height() as f64 * ratio).round().max(1.0) as u32;
    if canvas.width() == width && canvas.height() == height {
        return false;
    }
    canvas.set_width(width);
    canvas.set_height(height);
    true
}
