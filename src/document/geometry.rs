//! Normalized-to-pixel conversion. The assembler is the only place this happens.

use crate::foundation::core::{Canvas, PixelRect};
use crate::model::layer::BoundingBox;

fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// Clamp a box into the unit square: components into `[0, 1]`, extents so that
/// `x + width <= 1` and `y + height <= 1`. Non-finite components become 0.
pub fn clamp_bounding_box(b: BoundingBox) -> BoundingBox {
    let x = unit(b.x);
    let y = unit(b.y);
    BoundingBox {
        x,
        y,
        width: unit(b.width).min(1.0 - x),
        height: unit(b.height).min(1.0 - y),
    }
}

fn scale(v: f64, dim: u32) -> i32 {
    (v * f64::from(dim)).round() as i32
}

/// Absolute pixel origin of a (clamped) box.
pub fn to_pixel_origin(b: BoundingBox, canvas: Canvas) -> (i32, i32) {
    let b = clamp_bounding_box(b);
    (scale(b.x, canvas.width), scale(b.y, canvas.height))
}

/// Absolute pixel rectangle of a (clamped) box. Always lies within the canvas.
///
/// Edges are rounded independently, so a box thinner than half a pixel yields an empty rectangle.
pub fn to_pixel_rect(b: BoundingBox, canvas: Canvas) -> PixelRect {
    let b = clamp_bounding_box(b);
    PixelRect {
        left: scale(b.x, canvas.width),
        top: scale(b.y, canvas.height),
        right: scale(b.x + b.width, canvas.width),
        bottom: scale(b.y + b.height, canvas.height),
    }
}

/// Inverse of [`to_pixel_rect`], up to rounding.
pub fn to_normalized(rect: PixelRect, canvas: Canvas) -> BoundingBox {
    let w = f64::from(canvas.width.max(1));
    let h = f64::from(canvas.height.max(1));
    BoundingBox {
        x: f64::from(rect.left) / w,
        y: f64::from(rect.top) / h,
        width: f64::from(rect.width()) / w,
        height: f64::from(rect.height()) / h,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/geometry.rs"]
mod tests;
