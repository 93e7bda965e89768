//! Layered PSD (Photoshop document, version 1) writer.
//!
//! Only what a layered RGB 8-bit document needs is written: a header, empty color-mode and
//! image-resource sections, one record per layer with straight-alpha channel data, and a merged
//! composite for readers that do not understand layers.

use crate::encode::packbits::pack_row;
use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::foundation::math::opacity_to_u8;

/// Largest canvas side a version 1 PSD can describe.
pub const PSD_MAX_DIMENSION: u32 = 30_000;

const SIGNATURE: &[u8; 4] = b"8BPS";
const RESOURCE_SIGNATURE: &[u8; 4] = b"8BIM";
const BLEND_NORMAL: &[u8; 4] = b"norm";
const UNICODE_NAME_KEY: &[u8; 4] = b"luni";
const COLOR_MODE_RGB: u16 = 3;

// Channel ids in the order their data is written: alpha, then R, G, B.
const LAYER_CHANNELS: [(i16, usize); 4] = [(-1, 3), (0, 0), (1, 1), (2, 2)];

/// How channel rows are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed planes.
    Raw,
    /// PackBits run-length encoded rows.
    #[default]
    Rle,
}

impl Compression {
    fn code(self) -> u16 {
        match self {
            Self::Raw => 0,
            Self::Rle => 1,
        }
    }
}

/// One layer of a [`PsdDocument`].
#[derive(Clone, Copy, Debug)]
pub struct PsdLayer<'a> {
    /// Display name; stored both as a legacy Pascal string and as UTF-16.
    pub name: &'a str,
    /// Placement in canvas pixels. May extend past the canvas.
    pub bounds: PixelRect,
    /// Layer opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Straight-alpha RGBA8 pixels covering `bounds`, row-major.
    pub rgba8: &'a [u8],
}

/// A complete document ready to be written.
#[derive(Clone, Debug)]
pub struct PsdDocument<'a> {
    /// Document size.
    pub canvas: Canvas,
    /// Layers in file order: the top-most layer first.
    pub layers: Vec<PsdLayer<'a>>,
    /// Straight-alpha RGBA8 merged image covering the whole canvas.
    pub composite: &'a [u8],
}

/// Serialize `doc` as PSD bytes.
pub fn encode_psd(doc: &PsdDocument<'_>, compression: Compression) -> LayercraftResult<Vec<u8>> {
    validate(doc)?;

    let mut w = BeWriter::with_capacity(doc.canvas.rgba_len() * 2 + 1024);
    write_header(&mut w, doc.canvas);
    // Color mode data, then image resources: both empty for RGB.
    w.u32(0);
    w.u32(0);
    write_layer_and_mask_info(&mut w, doc, compression);
    write_merged_image(&mut w, doc.canvas, doc.composite, compression);
    Ok(w.into_inner())
}

fn validate(doc: &PsdDocument<'_>) -> LayercraftResult<()> {
    let Canvas { width, height } = doc.canvas;
    if width == 0 || height == 0 || width > PSD_MAX_DIMENSION || height > PSD_MAX_DIMENSION {
        return Err(LayercraftError::validation(format!(
            "psd canvas must be between 1x1 and {PSD_MAX_DIMENSION}x{PSD_MAX_DIMENSION}, got {width}x{height}"
        )));
    }
    if doc.composite.len() != doc.canvas.rgba_len() {
        return Err(LayercraftError::validation(format!(
            "composite has {} bytes, expected {}",
            doc.composite.len(),
            doc.canvas.rgba_len()
        )));
    }
    if doc.layers.len() > i16::MAX as usize {
        return Err(LayercraftError::validation(format!(
            "psd supports at most {} layers, got {}",
            i16::MAX,
            doc.layers.len()
        )));
    }
    for (idx, layer) in doc.layers.iter().enumerate() {
        let expected = layer.bounds.width() as usize * layer.bounds.height() as usize * 4;
        if layer.rgba8.len() != expected {
            return Err(LayercraftError::validation(format!(
                "layer {idx} (\"{}\") has {} bytes, expected {expected}",
                layer.name,
                layer.rgba8.len()
            )));
        }
        if layer.bounds.width() > PSD_MAX_DIMENSION || layer.bounds.height() > PSD_MAX_DIMENSION {
            return Err(LayercraftError::validation(format!(
                "layer {idx} (\"{}\") exceeds {PSD_MAX_DIMENSION} pixels per side",
                layer.name
            )));
        }
    }
    Ok(())
}

fn write_header(w: &mut BeWriter, canvas: Canvas) {
    w.bytes(SIGNATURE);
    w.u16(1);
    w.bytes(&[0; 6]);
    w.u16(4);
    w.u32(canvas.height);
    w.u32(canvas.width);
    w.u16(8);
    w.u16(COLOR_MODE_RGB);
}

fn write_layer_and_mask_info(w: &mut BeWriter, doc: &PsdDocument<'_>, compression: Compression) {
    let section = w.begin_len();

    let info = w.begin_len();
    if !doc.layers.is_empty() {
        // Negative count: the merged image's fourth channel is transparency.
        w.i16(-(doc.layers.len() as i16));

        let channel_data: Vec<[Vec<u8>; 4]> = doc
            .layers
            .iter()
            .map(|layer| encode_layer_channels(layer, compression))
            .collect();

        for (layer, channels) in doc.layers.iter().zip(&channel_data) {
            write_layer_record(w, layer, channels);
        }
        for channels in &channel_data {
            for data in channels {
                w.bytes(data);
            }
        }
    }
    w.pad_to(info, 2);
    w.end_len(info);

    // Global layer mask info.
    w.u32(0);
    w.end_len(section);
}

fn write_layer_record(w: &mut BeWriter, layer: &PsdLayer<'_>, channels: &[Vec<u8>; 4]) {
    let b = layer.bounds;
    w.i32(b.top);
    w.i32(b.left);
    w.i32(b.top + b.height() as i32);
    w.i32(b.left + b.width() as i32);

    w.u16(LAYER_CHANNELS.len() as u16);
    for ((id, _), data) in LAYER_CHANNELS.iter().zip(channels) {
        w.i16(*id);
        w.u32(data.len() as u32);
    }

    w.bytes(RESOURCE_SIGNATURE);
    w.bytes(BLEND_NORMAL);
    w.u8(opacity_to_u8(layer.opacity));
    // Clipping, flags, filler.
    w.bytes(&[0, 0, 0]);

    let extra = w.begin_len();
    // Layer mask data, then blending ranges: both empty.
    w.u32(0);
    w.u32(0);
    write_pascal_name(w, layer.name);
    write_unicode_name(w, layer.name);
    w.end_len(extra);
}

fn write_pascal_name(w: &mut BeWriter, name: &str) {
    let start = w.len();
    let legacy: Vec<u8> = name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .take(255)
        .collect();
    w.u8(legacy.len() as u8);
    w.bytes(&legacy);
    w.pad_to(start, 4);
}

fn write_unicode_name(w: &mut BeWriter, name: &str) {
    let units: Vec<u16> = name.encode_utf16().collect();
    w.bytes(RESOURCE_SIGNATURE);
    w.bytes(UNICODE_NAME_KEY);
    let block = w.begin_len();
    w.u32(units.len() as u32);
    for unit in units {
        w.u16(unit);
    }
    w.pad_to(block + 4, 4);
    w.end_len(block);
}

fn encode_layer_channels(layer: &PsdLayer<'_>, compression: Compression) -> [Vec<u8>; 4] {
    let width = layer.bounds.width() as usize;
    let height = layer.bounds.height() as usize;
    LAYER_CHANNELS.map(|(_, offset)| {
        if width == 0 || height == 0 {
            return Compression::Raw.code().to_be_bytes().to_vec();
        }
        let plane = extract_plane(layer.rgba8, offset);
        let mut out = Vec::with_capacity(2 + plane.len());
        out.extend_from_slice(&compression.code().to_be_bytes());
        match compression {
            Compression::Raw => out.extend_from_slice(&plane),
            Compression::Rle => {
                let (counts, rows) = pack_plane(&plane, width);
                for count in counts {
                    out.extend_from_slice(&count.to_be_bytes());
                }
                out.extend_from_slice(&rows);
            }
        }
        out
    })
}

fn write_merged_image(w: &mut BeWriter, canvas: Canvas, composite: &[u8], compression: Compression) {
    w.u16(compression.code());
    let planes: Vec<Vec<u8>> = (0..4).map(|c| extract_plane(composite, c)).collect();
    match compression {
        Compression::Raw => {
            for plane in &planes {
                w.bytes(plane);
            }
        }
        Compression::Rle => {
            let packed: Vec<(Vec<u16>, Vec<u8>)> = planes
                .iter()
                .map(|plane| pack_plane(plane, canvas.width as usize))
                .collect();
            for (counts, _) in &packed {
                for &count in counts {
                    w.u16(count);
                }
            }
            for (_, rows) in &packed {
                w.bytes(rows);
            }
        }
    }
}

fn extract_plane(rgba8: &[u8], offset: usize) -> Vec<u8> {
    rgba8.chunks_exact(4).map(|px| px[offset]).collect()
}

/// PackBits each row of `plane`; returns per-row byte counts and the concatenated rows.
fn pack_plane(plane: &[u8], width: usize) -> (Vec<u16>, Vec<u8>) {
    let mut counts = Vec::with_capacity(plane.len() / width.max(1));
    let mut out = Vec::with_capacity(plane.len() / 2);
    for row in plane.chunks_exact(width) {
        let before = out.len();
        pack_row(row, &mut out);
        // A row of at most PSD_MAX_DIMENSION bytes packs to well under u16::MAX.
        counts.push((out.len() - before) as u16);
    }
    (counts, out)
}

/// Big-endian byte writer with back-patched u32 length prefixes.
struct BeWriter {
    buf: Vec<u8>,
}

impl BeWriter {
    fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    /// Reserve a u32 length slot; returns its position.
    fn begin_len(&mut self) -> usize {
        let pos = self.buf.len();
        self.u32(0);
        pos
    }

    /// Fill the slot at `pos` with the number of bytes written after it.
    fn end_len(&mut self, pos: usize) {
        let len = (self.buf.len() - pos - 4) as u32;
        self.buf[pos..pos + 4].copy_from_slice(&len.to_be_bytes());
    }

    /// Zero-pad so the bytes written since `start` are a multiple of `align`.
    fn pad_to(&mut self, start: usize, align: usize) {
        while (self.buf.len() - start) % align != 0 {
            self.buf.push(0);
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/psd.rs"]
mod tests;
