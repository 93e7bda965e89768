//! Extraction client: asks the model to cut one layer out onto a transparent background.

use crate::decompose::validate_image_input;
use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::model::cache::ExtractedImage;
use crate::model::layer::Layer;
use crate::remote::client::ModelClient;
use crate::remote::wire::{GenerateContentRequest, GenerationConfig, Part};

/// Build the extraction prompt for `layer`.
///
/// The bounding box disambiguates between overlapping candidates that match the description.
pub fn extraction_prompt(layer: &Layer) -> String {
    let b = layer.bounding_box;
    format!(
        "Extract only the element described as \"{desc}\" from this image.\n\
         It is located at approximately x={x:.3}, y={y:.3}, width={w:.3}, height={h:.3} \
         (fractions of the image size, origin at the top-left corner).\n\
         Return a single image containing only this element, cropped tightly to its content, on a \
         fully transparent background. Do not include any other part of the image.",
        desc = layer.description,
        x = b.x,
        y = b.y,
        w = b.width,
        h = b.height,
    )
}

/// Retrieves transparent-background cutouts for single layers.
///
/// This client performs no caching; callers keep results in an
/// [`ExtractionCache`](crate::ExtractionCache) and skip layers that already have one.
#[derive(Debug)]
pub struct Extractor<C> {
    client: C,
    model: String,
}

impl<C: ModelClient> Extractor<C> {
    /// Extract with `model` through `client`.
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Model name used for requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request for `layer` without sending it.
    pub fn build_request(image_bytes: &[u8], mime_type: &str, layer: &Layer) -> GenerateContentRequest {
        GenerateContentRequest::user(vec![
            Part::inline(mime_type, image_bytes),
            Part::text(extraction_prompt(layer)),
        ])
        .with_config(GenerationConfig {
            response_mime_type: None,
            response_schema: None,
            response_modalities: Some(vec!["IMAGE".to_owned(), "TEXT".to_owned()]),
        })
    }

    /// Request a cutout of `layer` from the source image.
    ///
    /// Fails with [`LayercraftError::EmptyResult`] when the response carries no image part.
    #[tracing::instrument(skip(self, image_bytes, layer), fields(layer = %layer.name, model = %self.model))]
    pub fn extract(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        layer: &Layer,
    ) -> LayercraftResult<ExtractedImage> {
        validate_image_input(image_bytes, mime_type)?;

        let request = Self::build_request(image_bytes, mime_type, layer);
        let response = self.client.generate(&self.model, &request)?;
        let inline = response.first_inline_image().ok_or_else(|| {
            LayercraftError::empty_result(format!(
                "no image returned for layer \"{}\" (finish reason: {})",
                layer.name,
                response.finish_reason().unwrap_or("unknown")
            ))
        })?;

        let bytes = inline.decode()?;
        if bytes.is_empty() {
            return Err(LayercraftError::empty_result(format!(
                "empty image payload for layer \"{}\"",
                layer.name
            )));
        }
        tracing::debug!(bytes = bytes.len(), mime = %inline.mime_type, "cutout received");
        Ok(ExtractedImage::new(inline.mime_type.clone(), bytes))
    }
}

#[cfg(test)]
#[path = "../tests/unit/extract.rs"]
mod tests;
