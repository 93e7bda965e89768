use serde::{Deserialize, Serialize};

use crate::model::text::{HexColor, text_colors};

/// Normalized rectangle relative to the source image, origin top-left.
///
/// Every field is a fraction of the image width/height. The producer is expected to keep
/// `x + width <= 1` and `y + height <= 1`, but nothing enforces it; the document assembler clamps
/// when it converts to pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge as a fraction of image width.
    pub x: f64,
    /// Top edge as a fraction of image height.
    pub y: f64,
    /// Width as a fraction of image width.
    pub width: f64,
    /// Height as a fraction of image height.
    pub height: f64,
}

impl BoundingBox {
    /// Build a box from its four normalized components.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether every component is finite and the box stays inside `[0, 1]`.
    pub fn is_within_unit(&self) -> bool {
        let parts = [self.x, self.y, self.width, self.height];
        parts.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v))
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }
}

/// Closed set of layer kinds reported by the decomposition model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerCategory {
    /// Photographic or illustrated content; eligible for cutout extraction.
    Image,
    /// Flat geometric content.
    Shape,
    /// Typography; the description carries the literal text and color hex codes.
    Text,
}

impl LayerCategory {
    /// All categories, in the order the model schema lists them.
    pub const ALL: [Self; 3] = [Self::Image, Self::Shape, Self::Text];

    /// Wire name used by the model schema.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Text => "text",
        }
    }

    /// Upper-case tag used to prefix guide layer names.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Shape => "SHAPE",
            Self::Text => "TEXT",
        }
    }
}

impl std::fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One semantic region of a decomposed image.
///
/// Cached cutouts are not stored here; they live in the session's
/// [`ExtractionCache`](crate::ExtractionCache), keyed by the layer's index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Short human-readable name.
    pub name: String,
    /// Free-text description; for text layers it includes the literal text and its colors.
    pub description: String,
    /// Layer kind.
    #[serde(rename = "type")]
    pub category: LayerCategory,
    /// Normalized placement within the source image.
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBox,
}

impl Layer {
    /// Build a layer record.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: LayerCategory,
        bounding_box: BoundingBox,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            bounding_box,
        }
    }

    /// Hex colors mentioned in a text layer's description; empty for other categories.
    pub fn text_colors(&self) -> Vec<HexColor> {
        match self.category {
            LayerCategory::Text => text_colors(&self.description),
            LayerCategory::Image | LayerCategory::Shape => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/layer.rs"]
mod tests;
