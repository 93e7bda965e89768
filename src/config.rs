//! Client configuration read from the environment.

use std::time::Duration;

use crate::foundation::error::{LayercraftError, LayercraftResult};

/// Default `generateContent` API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model used for decomposition.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
/// Default model used for cutout extraction.
pub const DEFAULT_EXTRACTION_MODEL: &str = "gemini-2.5-flash-image";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Settings for talking to the external multimodal model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API key sent with every request.
    pub api_key: Option<String>,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Model that decomposes images into layers.
    pub analysis_model: String,
    /// Model that cuts out a single layer.
    pub extraction_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_owned(),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_owned(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// - `LAYERCRAFT_API_KEY` (falls back to `GEMINI_API_KEY`)
    /// - `LAYERCRAFT_API_URL`
    /// - `LAYERCRAFT_ANALYSIS_MODEL`
    /// - `LAYERCRAFT_EXTRACTION_MODEL`
    /// - `LAYERCRAFT_TIMEOUT_MS`
    pub fn from_env() -> LayercraftResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LayercraftResult<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut cfg = Self {
            api_key: non_empty("LAYERCRAFT_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")),
            ..Self::default()
        };
        if let Some(url) = non_empty("LAYERCRAFT_API_URL") {
            cfg.base_url = url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(model) = non_empty("LAYERCRAFT_ANALYSIS_MODEL") {
            cfg.analysis_model = model;
        }
        if let Some(model) = non_empty("LAYERCRAFT_EXTRACTION_MODEL") {
            cfg.extraction_model = model;
        }
        if let Some(raw) = non_empty("LAYERCRAFT_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                LayercraftError::validation(format!(
                    "LAYERCRAFT_TIMEOUT_MS must be an integer, got \"{raw}\""
                ))
            })?;
            cfg.timeout = Duration::from_millis(ms);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check invariants that do not depend on the network.
    pub fn validate(&self) -> LayercraftResult<()> {
        if self.timeout.is_zero() {
            return Err(LayercraftError::validation("request timeout must be > 0"));
        }
        if self.base_url.is_empty() {
            return Err(LayercraftError::validation("base url must be non-empty"));
        }
        if self.analysis_model.is_empty() || self.extraction_model.is_empty() {
            return Err(LayercraftError::validation("model names must be non-empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
