use std::cell::RefCell;
use std::f64::consts::TAU;

use raspadinha_core::{AlphaSource, CanvasScale, CoverSurface, Point};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

const FALLBACK_LABEL: &str = "RASPE AQUI";

/// The scratchable cover, painted on a 2D canvas laid over the grid.
///
/// Pixel reads go through a snapshot of the canvas that is taken lazily and
/// dropped on every paint, so a coverage pass costs one `getImageData`.
pub(crate) struct CanvasCover {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    pixels: RefCell<Option<Vec<u8>>>,
}

impl CanvasCover {
    pub(crate) fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            canvas,
            context,
            pixels: RefCell::new(None),
        })
    }

    /// Maps viewport coordinates of a pointer to canvas pixels.
    pub(crate) fn client_to_canvas(&self, client_x: f64, client_y: f64) -> Point {
        let rect = self.canvas.get_bounding_client_rect();
        CanvasScale::new(
            (rect.left(), rect.top()),
            (rect.width(), rect.height()),
            (self.canvas.width(), self.canvas.height()),
        )
        .to_canvas(client_x, client_y)
    }

    fn extent(&self) -> (f64, f64) {
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    /// Solid cover, used while the art loads and when it cannot be loaded.
    pub(crate) fn paint_fill(&mut self, color: &str) {
        let (width, height) = self.extent();
        let ctx = &self.context;
        ctx.save();
        if let Err(err) = ctx.set_global_composite_operation("source-over") {
            log::warn!("fill composite mode rejected: {err:?}");
        }
        ctx.clear_rect(0.0, 0.0, width, height);
        ctx.set_fill_style_str(color);
        ctx.fill_rect(0.0, 0.0, width, height);
        ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
        ctx.set_font(&format!("bold {}px sans-serif", (height / 10.0).round()));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        if let Err(err) = ctx.fill_text(FALLBACK_LABEL, width / 2.0, height / 2.0) {
            log::warn!("cover label not drawn: {err:?}");
        }
        ctx.restore();
        self.invalidate();
    }

    pub(crate) fn paint_image(&mut self, image: &HtmlImageElement) -> Result<(), JsValue> {
        let (width, height) = self.extent();
        let ctx = &self.context;
        ctx.save();
        ctx.set_global_composite_operation("source-over")?;
        ctx.clear_rect(0.0, 0.0, width, height);
        let drawn = ctx.draw_image_with_html_image_element_and_dw_and_dh(image, 0.0, 0.0, width, height);
        ctx.restore();
        self.invalidate();
        drawn
    }

    fn invalidate(&self) {
        self.pixels.replace(None);
    }

    fn read_pixels(&self) -> Vec<u8> {
        let (width, height) = self.extent();
        match self.context.get_image_data(0.0, 0.0, width, height) {
            Ok(image) => image.data().0,
            Err(err) => {
                // a tainted canvas cannot be read back, treat it as still covered
                log::error!("failed to read cover pixels: {err:?}");
                Vec::new()
            }
        }
    }
}

impl AlphaSource for CanvasCover {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let mut pixels = self.pixels.borrow_mut();
        let data = pixels.get_or_insert_with(|| self.read_pixels());
        let offset = (y as usize * self.canvas.width() as usize + x as usize) * 4 + 3;
        data.get(offset).copied().unwrap_or(u8::MAX)
    }
}

impl CoverSurface for CanvasCover {
    fn erase_circle(&mut self, center: Point, radius: f64) {
        let ctx = &self.context;
        ctx.save();
        if let Err(err) = ctx.set_global_composite_operation("destination-out") {
            log::warn!("erase composite mode rejected: {err:?}");
        }
        ctx.begin_path();
        if let Err(err) = ctx.arc(center.x, center.y, radius, 0.0, TAU) {
            log::warn!("erase failed: {err:?}");
        }
        ctx.fill();
        ctx.restore();
        self.invalidate();
    }
}
