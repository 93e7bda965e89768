use std::sync::Arc;

use crate::config::ClientConfig;
use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::remote::wire::{GenerateContentRequest, GenerateContentResponse};

/// A multimodal model reachable through a `generateContent`-style call.
///
/// Calls block until the model answers or the implementation's timeout fires. Implementations
/// must be shareable across threads so independent extractions can run concurrently.
pub trait ModelClient: Send + Sync {
    /// Send `request` to `model` and return its raw response.
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LayercraftResult<GenerateContentResponse>;
}

impl<C: ModelClient + ?Sized> ModelClient for Arc<C> {
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LayercraftResult<GenerateContentResponse> {
        (**self).generate(model, request)
    }
}

impl<C: ModelClient + ?Sized> ModelClient for Box<C> {
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LayercraftResult<GenerateContentResponse> {
        (**self).generate(model, request)
    }
}

/// Blocking HTTP client for the hosted model API.
#[derive(Debug)]
pub struct HttpModelClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    timeout_ms: u128,
}

impl HttpModelClient {
    /// Build a client from `config`; an API key is required.
    pub fn new(config: &ClientConfig) -> LayercraftResult<Self> {
        config.validate()?;
        let api_key = config.api_key.clone().ok_or_else(|| {
            LayercraftError::validation(
                "no API key configured (set LAYERCRAFT_API_KEY or GEMINI_API_KEY)",
            )
        })?;
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                LayercraftError::remote_service(format!("failed to build http client: {e}"))
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            timeout_ms: config.timeout.as_millis(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

impl ModelClient for HttpModelClient {
    #[tracing::instrument(skip(self, request))]
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LayercraftResult<GenerateContentResponse> {
        let url = self.endpoint(model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LayercraftError::remote_service(format!(
                        "model request timed out after {} ms",
                        self.timeout_ms
                    ))
                } else if e.is_connect() {
                    LayercraftError::remote_service(format!(
                        "cannot connect to {}: {e}",
                        self.base_url
                    ))
                } else {
                    LayercraftError::remote_service(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LayercraftError::remote_service(format!(
                "model returned {status}: {}",
                truncate(&body, 512)
            )));
        }

        let parsed = response.json::<GenerateContentResponse>().map_err(|e| {
            LayercraftError::remote_service(format!("invalid response envelope: {e}"))
        })?;
        tracing::debug!(
            candidates = parsed.candidates.len(),
            finish_reason = parsed.finish_reason().unwrap_or("none"),
            "model responded"
        );
        Ok(parsed)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/remote/client.rs"]
mod tests;
