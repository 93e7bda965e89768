//! Layercraft turns a flat raster image into a layered Photoshop document.
//!
//! The pipeline has three stages, each independently retriable:
//!
//! - [`Decomposer`] asks a multimodal model for the image's layers (bottom-to-top, with
//!   normalized bounding boxes and an `image`/`shape`/`text` category).
//! - [`Extractor`] asks the model for a transparent cutout of one layer. Results are cached per
//!   layer index in an [`ExtractionCache`] so a layer is never requested twice.
//! - [`assemble`] stacks the source image, the cached cutouts and translucent guide rectangles
//!   for everything else into PSD bytes.
//!
//! [`Session`] ties the stages together for one source image.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod config;
mod decompose;
mod document;
mod encode;
mod extract;
mod foundation;
mod model;
mod remote;
mod session;

pub use crate::assets::decode::{DecodedImage, decode_image, sniff_mime_type};
pub use crate::config::{
    ClientConfig, DEFAULT_ANALYSIS_MODEL, DEFAULT_BASE_URL, DEFAULT_EXTRACTION_MODEL,
    DEFAULT_TIMEOUT_MS,
};
pub use crate::decompose::{DECOMPOSE_INSTRUCTIONS, Decomposer, layer_response_schema, parse_layers};
pub use crate::document::assemble::{
    AssembleOpts, AssembledDocument, DEFAULT_SOURCE_LAYER_NAME, DocumentLayerInfo, LayerIssue,
    RenderedDocument, RenderedKind, RenderedLayer, assemble, encode_document, flatten,
    render_document,
};
pub use crate::document::geometry::{
    clamp_bounding_box, to_normalized, to_pixel_origin, to_pixel_rect,
};
pub use crate::document::guide::{GUIDE_FILL_ALPHA, guide_color, guide_name};
pub use crate::encode::psd::{Compression, PSD_MAX_DIMENSION, PsdDocument, PsdLayer, encode_psd};
pub use crate::extract::{Extractor, extraction_prompt};
pub use crate::foundation::core::{Canvas, PixelRect, Rgba8};
pub use crate::foundation::error::{LayercraftError, LayercraftResult};
pub use crate::model::cache::{
    BeginExtraction, ExtractedImage, ExtractionCache, ExtractionSnapshot, ExtractionStatus,
    ExtractionTicket,
};
pub use crate::model::layer::{BoundingBox, Layer, LayerCategory};
pub use crate::model::text::{HexColor, parse_hex_color, text_colors};
pub use crate::remote::client::{HttpModelClient, ModelClient};
pub use crate::remote::mock::MockModelClient;
pub use crate::remote::wire::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part,
};
pub use crate::session::{Session, SourceImage};
