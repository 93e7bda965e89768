use crate::foundation::error::{LayercraftError, LayercraftResult};

/// Document canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> LayercraftResult<Self> {
        if width == 0 || height == 0 {
            return Err(LayercraftError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of bytes in a tightly packed RGBA8 buffer covering the canvas.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }

    /// The rectangle covering the whole canvas.
    pub fn full_rect(self) -> PixelRect {
        PixelRect {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        }
    }
}

/// Absolute pixel rectangle, edges in document space.
///
/// `right`/`bottom` are exclusive, matching how the document container stores layer bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl PixelRect {
    /// Rectangle at `(left, top)` with the given size.
    pub fn from_origin_size(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            right: left.saturating_add(width as i32),
            bottom: top.saturating_add(height as i32),
        }
    }

    /// Width in pixels (0 for inverted rectangles).
    pub fn width(self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    /// Height in pixels (0 for inverted rectangles).
    pub fn height(self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersection with the canvas; may be empty.
    pub fn clip_to(self, canvas: Canvas) -> Self {
        let full = canvas.full_rect();
        let left = self.left.clamp(full.left, full.right);
        let top = self.top.clamp(full.top, full.bottom);
        Self {
            left,
            top,
            right: self.right.clamp(left, full.right),
            bottom: self.bottom.clamp(top, full.bottom),
        }
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Build a straight-alpha color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channel bytes in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
