//! Guide rectangles: translucent stand-ins for layers without real pixels.

use crate::foundation::core::{Canvas, PixelRect, Rgba8};
use crate::model::layer::LayerCategory;

/// Alpha of every guide fill (about 30%).
pub const GUIDE_FILL_ALPHA: u8 = 77;

/// Fixed guide fill color per category: image is green, shape yellow, text red.
pub fn guide_color(category: LayerCategory) -> Rgba8 {
    match category {
        LayerCategory::Image => Rgba8::new(0, 255, 0, GUIDE_FILL_ALPHA),
        LayerCategory::Shape => Rgba8::new(255, 255, 0, GUIDE_FILL_ALPHA),
        LayerCategory::Text => Rgba8::new(255, 0, 0, GUIDE_FILL_ALPHA),
    }
}

/// Layer-panel name of a guide, e.g. `[TEXT] Headline`.
pub fn guide_name(category: LayerCategory, name: &str) -> String {
    format!("[{}] {name}", category.tag())
}

/// Paints full-canvas guide rasters, reusing one scratch buffer.
#[derive(Debug)]
pub(crate) struct GuideRasterizer {
    canvas: Canvas,
    scratch: Vec<u8>,
}

impl GuideRasterizer {
    pub(crate) fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            scratch: vec![0u8; canvas.rgba_len()],
        }
    }

    /// Clear the scratch canvas, fill `rect` (clipped to the canvas) with `color` and return a copy.
    pub(crate) fn render(&mut self, rect: PixelRect, color: Rgba8) -> Vec<u8> {
        self.scratch.fill(0);
        let clipped = rect.clip_to(self.canvas);
        if !clipped.is_empty() {
            let stride = self.canvas.width as usize * 4;
            let px = color.to_array();
            let x0 = clipped.left as usize * 4;
            let x1 = clipped.right as usize * 4;
            for y in clipped.top as usize..clipped.bottom as usize {
                let row = &mut self.scratch[y * stride + x0..y * stride + x1];
                for dst in row.chunks_exact_mut(4) {
                    dst.copy_from_slice(&px);
                }
            }
        }
        self.scratch.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/guide.rs"]
mod tests;
