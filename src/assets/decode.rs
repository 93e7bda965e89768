use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{LayercraftError, LayercraftResult};

/// A raster decoded to straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major straight-alpha RGBA8.
    pub rgba8: Vec<u8>,
}

impl DecodedImage {
    /// Canvas matching the image dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Decode any raster format supported by the `image` crate.
pub fn decode_image(bytes: &[u8]) -> LayercraftResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(|e| LayercraftError::decode(format!("{e:#}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(LayercraftError::decode("image has zero width or height"));
    }

    Ok(DecodedImage {
        width,
        height,
        rgba8: rgba.into_raw(),
    })
}

/// Guess the MIME type of encoded image bytes from their signature.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    match format {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        image::ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
