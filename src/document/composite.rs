//! Premultiplied "over" compositing used to flatten the document preview.

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::foundation::math::{mul_div255_u8, opacity_to_u8};

pub(crate) type PremulRgba8 = [u8; 4];

pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = u16::from(opacity_to_u8(opacity));
    if op == 0 || src[3] == 0 {
        return dst;
    }

    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `src` (premultiplied, covering `rect`) over the full-canvas `dst`.
///
/// Parts of `rect` outside the canvas are skipped.
pub(crate) fn over_region_in_place(
    dst: &mut [u8],
    canvas: Canvas,
    src: &[u8],
    rect: PixelRect,
    opacity: f32,
) -> LayercraftResult<()> {
    if dst.len() != canvas.rgba_len() {
        return Err(LayercraftError::validation(
            "over_region_in_place expects a full-canvas rgba8 destination",
        ));
    }
    let src_w = rect.width() as usize;
    if src.len() != src_w * rect.height() as usize * 4 {
        return Err(LayercraftError::validation(
            "over_region_in_place expects source matching rect width*height*4",
        ));
    }

    let clipped = rect.clip_to(canvas);
    if clipped.is_empty() {
        return Ok(());
    }

    let dst_stride = canvas.width as usize * 4;
    for y in clipped.top..clipped.bottom {
        let sy = (y - rect.top) as usize;
        for x in clipped.left..clipped.right {
            let sx = (x - rect.left) as usize;
            let si = (sy * src_w + sx) * 4;
            let di = y as usize * dst_stride + x as usize * 4;
            let s = [src[si], src[si + 1], src[si + 2], src[si + 3]];
            let d = [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]];
            dst[di..di + 4].copy_from_slice(&over(d, s, opacity));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/document/composite.rs"]
mod tests;
