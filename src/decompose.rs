//! Decomposition client: asks the model for the layer structure of an image.

use serde::Deserialize;

use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::model::layer::{Layer, LayerCategory};
use crate::remote::client::ModelClient;
use crate::remote::wire::{GenerateContentRequest, GenerationConfig, Part};

/// Fixed instructions sent with every decomposition request.
pub const DECOMPOSE_INSTRUCTIONS: &str = "\
Analyze this image and decompose it into the distinct visual layers a designer would use to \
rebuild it in a layered editor.
For every layer return:
- name: a short, unique, human-readable name.
- description: what the layer contains. For text layers include the exact text content and the \
text color(s) as hex codes (for example #1A2B3C).
- type: one of \"image\", \"shape\" or \"text\".
- boundingBox: x, y, width and height as fractions between 0 and 1 of the image width and \
height, measured from the top-left corner.
Order the layers from bottom to top: the background first, the foreground-most element last.";

/// Machine-checkable output schema for the decomposition response.
pub fn layer_response_schema() -> serde_json::Value {
    let categories: Vec<&str> = LayerCategory::ALL.iter().map(|c| c.as_str()).collect();
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "description": { "type": "STRING" },
                "type": { "type": "STRING", "enum": categories },
                "boundingBox": {
                    "type": "OBJECT",
                    "properties": {
                        "x": { "type": "NUMBER" },
                        "y": { "type": "NUMBER" },
                        "width": { "type": "NUMBER" },
                        "height": { "type": "NUMBER" }
                    },
                    "required": ["x", "y", "width", "height"]
                }
            },
            "required": ["name", "description", "type", "boundingBox"]
        }
    })
}

/// Turns a raw image into an ordered, background-first list of [`Layer`]s.
#[derive(Debug)]
pub struct Decomposer<C> {
    client: C,
    model: String,
}

impl<C: ModelClient> Decomposer<C> {
    /// Decompose with `model` through `client`.
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

    /// Build the request for `image_bytes` without sending it.
    pub fn build_request(image_bytes: &[u8], mime_type: &str) -> GenerateContentRequest {
        GenerateContentRequest::user(vec![
            Part::inline(mime_type, image_bytes),
            Part::text(DECOMPOSE_INSTRUCTIONS),
        ])
        .with_config(GenerationConfig {
            response_mime_type: Some("application/json".to_owned()),
            response_schema: Some(layer_response_schema()),
            response_modalities: None,
        })
    }

    /// Ask the model for the image's layers.
    ///
    /// The result is not reproducible across calls: the same image may decompose differently.
    #[tracing::instrument(skip(self, image_bytes), fields(bytes = image_bytes.len(), model = %self.model))]
    pub fn decompose(&self, image_bytes: &[u8], mime_type: &str) -> LayercraftResult<Vec<Layer>> {
        validate_image_input(image_bytes, mime_type)?;

        let request = Self::build_request(image_bytes, mime_type);
        let response = self.client.generate(&self.model, &request)?;
        let text = response.text().ok_or_else(|| {
            LayercraftError::schema_violation(format!(
                "response contained no text (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            ))
        })?;

        let layers = parse_layers(&text)?;
        tracing::debug!(layers = layers.len(), "decomposition parsed");
        if layers.is_empty() {
            tracing::warn!("model reported no layers");
        }
        Ok(layers)
    }
}

pub(crate) fn validate_image_input(image_bytes: &[u8], mime_type: &str) -> LayercraftResult<()> {
    if image_bytes.is_empty() {
        return Err(LayercraftError::validation("image bytes must be non-empty"));
    }
    if !mime_type.starts_with("image/") {
        return Err(LayercraftError::validation(format!(
            "expected an image MIME type, got \"{mime_type}\""
        )));
    }
    Ok(())
}

/// Parse the model's JSON text into layers.
///
/// The text must be a JSON array (optionally wrapped in a Markdown code fence). Every element
/// must carry `name`, `description`, `type` and `boundingBox{x,y,width,height}`; the first bad
/// element fails the whole batch so no partially accepted list is ever returned.
pub fn parse_layers(text: &str) -> LayercraftResult<Vec<Layer>> {
    let body = strip_code_fence(text);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| LayercraftError::schema_violation(format!("response is not JSON: {e}")))?;

    let serde_json::Value::Array(items) = value else {
        return Err(LayercraftError::schema_violation(format!(
            "expected a JSON array of layers, got {}",
            json_kind(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            Layer::deserialize(item)
                .map_err(|e| LayercraftError::schema_violation(format!("layer {idx}: {e}")))
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "../tests/unit/decompose.rs"]
mod tests;
