//! Document assembly: source image, cutouts and guides stacked into a layered PSD.

use crate::assets::decode::{DecodedImage, decode_image};
use crate::document::composite::over_region_in_place;
use crate::document::geometry::{to_pixel_origin, to_pixel_rect};
use crate::document::guide::{GuideRasterizer, guide_color, guide_name};
use crate::encode::psd::{Compression, PSD_MAX_DIMENSION, PsdDocument, PsdLayer, encode_psd};
use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::LayercraftResult;
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::model::cache::{ExtractedImage, ExtractionSnapshot};
use crate::model::layer::{Layer, LayerCategory};

/// Name given to the bottom-most layer holding the untouched source pixels.
pub const DEFAULT_SOURCE_LAYER_NAME: &str = "Original Image";

/// Options controlling document assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembleOpts {
    /// Opacity of guide layers, so they read as annotations rather than content.
    pub guide_opacity: f32,
    /// Channel compression used in the written document.
    pub compression: Compression,
    /// Name of the source-image layer.
    pub source_layer_name: String,
}

impl Default for AssembleOpts {
    fn default() -> Self {
        Self {
            guide_opacity: 0.5,
            compression: Compression::Rle,
            source_layer_name: DEFAULT_SOURCE_LAYER_NAME.to_owned(),
        }
    }
}

/// What a document layer was rendered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderedKind {
    /// The decoded source image.
    Source,
    /// A cached cutout placed at its layer's origin.
    Cutout,
    /// A translucent rectangle standing in for a layer of this category.
    Guide(LayerCategory),
}

/// One document layer with its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedLayer {
    /// Layer-panel name.
    pub name: String,
    /// How the pixels were produced.
    pub kind: RenderedKind,
    /// Index into the input layer list; `None` for the source layer.
    pub source_index: Option<usize>,
    /// Absolute placement in canvas pixels.
    pub bounds: PixelRect,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Straight-alpha RGBA8 pixels covering `bounds`.
    pub rgba8: Vec<u8>,
}

/// A per-layer problem that did not abort assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerIssue {
    /// Index into the input layer list.
    pub index: usize,
    /// Name of the affected layer.
    pub name: String,
    /// What went wrong.
    pub message: String,
}

/// Rendered layers ready for serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedDocument {
    /// Document size, equal to the source image size.
    pub canvas: Canvas,
    /// Layers in file order: foreground first, source image last.
    pub layers: Vec<RenderedLayer>,
    /// Layers that fell back to a guide.
    pub issues: Vec<LayerIssue>,
}

/// Summary of one serialized layer.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentLayerInfo {
    /// Layer-panel name.
    pub name: String,
    /// How the pixels were produced.
    pub kind: RenderedKind,
    /// Index into the input layer list; `None` for the source layer.
    pub source_index: Option<usize>,
    /// Absolute placement in canvas pixels.
    pub bounds: PixelRect,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
}

impl From<&RenderedLayer> for DocumentLayerInfo {
    fn from(l: &RenderedLayer) -> Self {
        Self {
            name: l.name.clone(),
            kind: l.kind,
            source_index: l.source_index,
            bounds: l.bounds,
            opacity: l.opacity,
        }
    }
}

/// A serialized document plus what went into it.
#[derive(Clone, Debug)]
pub struct AssembledDocument {
    /// Document size.
    pub canvas: Canvas,
    /// PSD file bytes.
    pub bytes: Vec<u8>,
    /// Serialized layers in file order (foreground first).
    pub layers: Vec<DocumentLayerInfo>,
    /// Layers that fell back to a guide.
    pub issues: Vec<LayerIssue>,
}

/// Build the document layers for `layers` over the decoded source image.
///
/// `layers` is bottom-to-top. Every input layer yields exactly one document layer: an `image`
/// layer with a cutout in `cutouts` is placed at its bounding-box origin at the cutout's own size,
/// anything else becomes a full-canvas guide. The returned list is in file order.
pub fn render_document(
    original: &DecodedImage,
    layers: &[Layer],
    cutouts: &ExtractionSnapshot,
    opts: &AssembleOpts,
) -> RenderedDocument {
    let canvas = original.canvas();
    let mut guides = GuideRasterizer::new(canvas);
    let mut issues = Vec::new();

    let mut out = Vec::with_capacity(layers.len() + 1);
    out.push(RenderedLayer {
        name: opts.source_layer_name.clone(),
        kind: RenderedKind::Source,
        source_index: None,
        bounds: canvas.full_rect(),
        opacity: 1.0,
        rgba8: original.rgba8.clone(),
    });

    for (index, layer) in layers.iter().enumerate() {
        let cutout = cutouts.get(index);
        if let Some(image) = cutout
            && layer.category == LayerCategory::Image
        {
            match render_cutout(index, layer, image, canvas) {
                Ok(rendered) => {
                    out.push(rendered);
                    continue;
                }
                Err(message) => {
                    tracing::warn!(index, layer = %layer.name, %message, "cutout unusable, using guide");
                    issues.push(LayerIssue {
                        index,
                        name: layer.name.clone(),
                        message,
                    });
                }
            }
        } else if cutout.is_some() {
            tracing::debug!(index, category = %layer.category, "ignoring cutout on non-image layer");
        }

        let rect = to_pixel_rect(layer.bounding_box, canvas);
        out.push(RenderedLayer {
            name: guide_name(layer.category, &layer.name),
            kind: RenderedKind::Guide(layer.category),
            source_index: Some(index),
            bounds: canvas.full_rect(),
            opacity: opts.guide_opacity.clamp(0.0, 1.0),
            rgba8: guides.render(rect, guide_color(layer.category)),
        });
    }

    // The container stores its foreground-most layer first.
    out.reverse();
    RenderedDocument {
        canvas,
        layers: out,
        issues,
    }
}

fn render_cutout(
    index: usize,
    layer: &Layer,
    image: &ExtractedImage,
    canvas: Canvas,
) -> Result<RenderedLayer, String> {
    let decoded = decode_image(image.bytes()).map_err(|e| e.to_string())?;
    if decoded.width > PSD_MAX_DIMENSION || decoded.height > PSD_MAX_DIMENSION {
        return Err(format!(
            "cutout is {}x{}, larger than {PSD_MAX_DIMENSION} pixels per side",
            decoded.width, decoded.height
        ));
    }
    let (left, top) = to_pixel_origin(layer.bounding_box, canvas);
    Ok(RenderedLayer {
        name: layer.name.clone(),
        kind: RenderedKind::Cutout,
        source_index: Some(index),
        bounds: PixelRect::from_origin_size(left, top, decoded.width, decoded.height),
        opacity: 1.0,
        rgba8: decoded.rgba8,
    })
}

/// Flatten `doc` bottom-to-top into a straight-alpha canvas-sized RGBA8 image.
pub fn flatten(doc: &RenderedDocument) -> LayercraftResult<Vec<u8>> {
    let mut acc = vec![0u8; doc.canvas.rgba_len()];
    let mut premul = Vec::new();
    for layer in doc.layers.iter().rev() {
        premul.clear();
        premul.extend_from_slice(&layer.rgba8);
        premultiply_rgba8_in_place(&mut premul);
        over_region_in_place(&mut acc, doc.canvas, &premul, layer.bounds, layer.opacity)?;
    }
    unpremultiply_rgba8_in_place(&mut acc);
    Ok(acc)
}

/// Serialize rendered layers, with a flattened composite, as PSD bytes.
pub fn encode_document(doc: &RenderedDocument, compression: Compression) -> LayercraftResult<Vec<u8>> {
    let composite = flatten(doc)?;
    let psd = PsdDocument {
        canvas: doc.canvas,
        layers: doc
            .layers
            .iter()
            .map(|l| PsdLayer {
                name: &l.name,
                bounds: l.bounds,
                opacity: l.opacity,
                rgba8: &l.rgba8,
            })
            .collect(),
        composite: &composite,
    };
    encode_psd(&psd, compression)
}

/// Decode `original_bytes` and build the layered document for `layers`.
///
/// Fails only when the source image cannot be decoded or the document cannot be written; an
/// unusable cutout degrades that single layer to a guide and is reported in
/// [`AssembledDocument::issues`].
#[tracing::instrument(skip_all, fields(layers = layers.len(), cutouts = cutouts.len()))]
pub fn assemble(
    original_bytes: &[u8],
    layers: &[Layer],
    cutouts: &ExtractionSnapshot,
    opts: &AssembleOpts,
) -> LayercraftResult<AssembledDocument> {
    let original = decode_image(original_bytes)?;
    let rendered = render_document(&original, layers, cutouts, opts);
    let bytes = encode_document(&rendered, opts.compression)?;
    tracing::info!(
        width = rendered.canvas.width,
        height = rendered.canvas.height,
        layers = rendered.layers.len(),
        issues = rendered.issues.len(),
        bytes = bytes.len(),
        "document assembled"
    );

    Ok(AssembledDocument {
        canvas: rendered.canvas,
        bytes,
        layers: rendered.layers.iter().map(DocumentLayerInfo::from).collect(),
        issues: rendered.issues,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/document/assemble.rs"]
mod tests;
