//! In-process model client for tests and offline runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::error::LayercraftResult;
use crate::remote::client::ModelClient;
use crate::remote::wire::{GenerateContentRequest, GenerateContentResponse};

type Handler = dyn Fn(&str, &GenerateContentRequest) -> LayercraftResult<GenerateContentResponse>
    + Send
    + Sync;

/// A [`ModelClient`] answered by a closure, recording every call it receives.
pub struct MockModelClient {
    handler: Box<Handler>,
    calls: AtomicUsize,
    models: Mutex<Vec<String>>,
}

impl std::fmt::Debug for MockModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockModelClient")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl MockModelClient {
    /// Answer every call with `handler(model, request)`.
    pub fn new(
        handler: impl Fn(&str, &GenerateContentRequest) -> LayercraftResult<GenerateContentResponse>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same text.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(GenerateContentResponse::from_text(text.clone())))
    }

    /// Answer every call with the same inline image.
    pub fn with_image(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = mime_type.into();
        Self::new(move |_, _| {
            Ok(GenerateContentResponse::from_inline_image(
                mime_type.clone(),
                &bytes,
            ))
        })
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Model names of the calls received so far, in arrival order.
    pub fn models_called(&self) -> Vec<String> {
        self.models
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ModelClient for MockModelClient {
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> LayercraftResult<GenerateContentResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.models.lock() {
            Ok(mut m) => m.push(model.to_owned()),
            Err(poisoned) => poisoned.into_inner().push(model.to_owned()),
        }
        (self.handler)(model, request)
    }
}
