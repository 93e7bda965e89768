//! Session-oriented workflow: one source image, its layers and their cached cutouts.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use crate::assets::decode::sniff_mime_type;
use crate::config::ClientConfig;
use crate::decompose::Decomposer;
use crate::document::assemble::{AssembleOpts, AssembledDocument, assemble};
use crate::extract::Extractor;
use crate::foundation::error::{LayercraftError, LayercraftResult};
use crate::model::cache::{BeginExtraction, ExtractedImage, ExtractionCache, ExtractionStatus};
use crate::model::layer::{Layer, LayerCategory};
use crate::remote::client::ModelClient;

/// Encoded source image handed to the model and decoded for export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    /// Encoded bytes as read from disk or upload.
    pub bytes: Arc<[u8]>,
    /// MIME type of `bytes`, e.g. `image/png`.
    pub mime_type: String,
}

impl SourceImage {
    /// Wrap encoded bytes with an explicit MIME type.
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Wrap encoded bytes, guessing the MIME type from their signature.
    pub fn sniffed(bytes: impl Into<Arc<[u8]>>) -> LayercraftResult<Self> {
        let bytes = bytes.into();
        let mime_type = sniff_mime_type(&bytes).ok_or_else(|| {
            LayercraftError::validation("unrecognized image format (expected png, jpeg, webp, gif or bmp)")
        })?;
        Ok(Self::new(bytes, mime_type))
    }
}

/// Drives decomposition, extraction and export for one source image.
///
/// The session owns the layer list and the extraction cache. Layers are replaced only by
/// [`Session::analyze`]; cutouts are written only through the cache, one index at a time, so
/// extractions of different layers can run concurrently while [`Session::export`] works from a
/// stable snapshot.
pub struct Session<C> {
    client: Arc<C>,
    decomposer: Decomposer<Arc<C>>,
    extractor: Extractor<Arc<C>>,
    source: SourceImage,
    layers: RwLock<Option<Arc<[Layer]>>>,
    cache: ExtractionCache,
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mime_type", &self.source.mime_type)
            .field("bytes", &self.source.bytes.len())
            .field("layers", &self.layers().map(|l| l.len()))
            .finish_non_exhaustive()
    }
}

impl<C> Session<C> {
    /// The model client shared by every request.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The source image.
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Current layers, bottom-to-top; `None` before a successful analysis.
    pub fn layers(&self) -> Option<Arc<[Layer]>> {
        self.read_layers().clone()
    }

    /// Extraction state of layer `index`.
    pub fn extraction_status(&self, index: usize) -> ExtractionStatus {
        self.cache.status(index)
    }

    /// Cached cutout of layer `index`, if any.
    pub fn cached(&self, index: usize) -> Option<ExtractedImage> {
        self.cache.get(index)
    }

    /// Discard layers and cutouts; responses still in flight will be dropped.
    pub fn reset(&self) {
        // The generation moves while the layers are write-locked, so no ticket can pair old
        // layers with the new generation.
        let mut layers = self.write_layers();
        *layers = None;
        self.cache.reset();
    }

    fn read_layers(&self) -> RwLockReadGuard<'_, Option<Arc<[Layer]>>> {
        self.layers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_layers(&self) -> RwLockWriteGuard<'_, Option<Arc<[Layer]>>> {
        self.layers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_layers(&self) -> LayercraftResult<Arc<[Layer]>> {
        self.layers().ok_or_else(no_layers)
    }
}

fn no_layers() -> LayercraftError {
    LayercraftError::validation("no layers yet; run analysis first")
}

impl<C: ModelClient> Session<C> {
    /// Create a session using the models named in `config`.
    pub fn new(client: C, config: &ClientConfig, source: SourceImage) -> Self {
        Self::with_models(
            client,
            &config.analysis_model,
            &config.extraction_model,
            source,
        )
    }

    /// Create a session with explicit model names.
    pub fn with_models(
        client: C,
        analysis_model: &str,
        extraction_model: &str,
        source: SourceImage,
    ) -> Self {
        let client = Arc::new(client);
        Self {
            decomposer: Decomposer::new(client.clone(), analysis_model),
            extractor: Extractor::new(client.clone(), extraction_model),
            client,
            source,
            layers: RwLock::new(None),
            cache: ExtractionCache::new(),
        }
    }

    /// Decompose the source image into layers.
    ///
    /// Any previous layers and cutouts are discarded first, so a failure leaves the session
    /// in its pre-analysis state and the call can simply be retried.
    pub fn analyze(&self) -> LayercraftResult<Arc<[Layer]>> {
        self.reset();
        let layers: Arc<[Layer]> = self
            .decomposer
            .decompose(&self.source.bytes, &self.source.mime_type)?
            .into();
        {
            let mut current = self.write_layers();
            // Drop anything extracted against a layer set another caller stored meanwhile.
            self.cache.reset();
            *current = Some(layers.clone());
        }
        tracing::info!(layers = layers.len(), "analysis complete");
        Ok(layers)
    }

    /// Cutout for layer `index`, requested from the model only if not cached yet.
    ///
    /// A failure leaves the layer `NotExtracted` so it can be retried without touching other
    /// layers.
    #[tracing::instrument(skip(self))]
    pub fn extract(&self, index: usize) -> LayercraftResult<ExtractedImage> {
        // Layer lookup and ticket issue happen under one read guard so the ticket's generation
        // always belongs to the layer set the request is built from.
        let (layer, ticket) = {
            let guard = self.read_layers();
            let layers = guard.as_ref().ok_or_else(no_layers)?;
            let layer = layers.get(index).cloned().ok_or_else(|| {
                LayercraftError::validation(format!(
                    "layer index {index} out of range (have {})",
                    layers.len()
                ))
            })?;
            match self.cache.begin(index)? {
                BeginExtraction::Cached(image) => {
                    tracing::debug!("cutout served from cache");
                    return Ok(image);
                }
                BeginExtraction::Started(ticket) => (layer, ticket),
            }
        };

        match self
            .extractor
            .extract(&self.source.bytes, &self.source.mime_type, &layer)
        {
            Ok(image) => {
                if ticket.complete(image.clone()) {
                    Ok(image)
                } else {
                    Err(LayercraftError::validation(format!(
                        "session was reset while layer {index} was extracting; result discarded"
                    )))
                }
            }
            Err(e) => {
                ticket.abandon();
                tracing::warn!(error = %e, "extraction failed");
                Err(e)
            }
        }
    }

    /// Extract several distinct layers concurrently.
    ///
    /// Returns one result per entry of `indices`, in the same order. `threads` overrides the
    /// worker count; `None` uses rayon's default.
    pub fn extract_many(
        &self,
        indices: &[usize],
        threads: Option<usize>,
    ) -> LayercraftResult<Vec<LayercraftResult<ExtractedImage>>> {
        let mut seen = BTreeSet::new();
        if let Some(dup) = indices.iter().find(|&&i| !seen.insert(i)) {
            return Err(LayercraftError::validation(format!(
                "layer index {dup} requested more than once"
            )));
        }
        self.current_layers()?;

        let pool = build_thread_pool(threads)?;
        Ok(pool.install(|| indices.par_iter().map(|&i| self.extract(i)).collect()))
    }

    /// Extract every `image` layer that has no cutout yet.
    pub fn extract_images(
        &self,
        threads: Option<usize>,
    ) -> LayercraftResult<Vec<(usize, LayercraftResult<ExtractedImage>)>> {
        let layers = self.current_layers()?;
        let indices: Vec<usize> = layers
            .iter()
            .enumerate()
            .filter(|(i, l)| {
                l.category == LayerCategory::Image
                    && self.cache.status(*i) == ExtractionStatus::NotExtracted
            })
            .map(|(i, _)| i)
            .collect();
        let results = self.extract_many(&indices, threads)?;
        Ok(indices.into_iter().zip(results).collect())
    }

    /// Assemble the current layers and cached cutouts into a document.
    ///
    /// Fails while any extraction is in flight. Session state is never modified.
    pub fn export(&self, opts: &AssembleOpts) -> LayercraftResult<AssembledDocument> {
        let (layers, snapshot) = {
            let guard = self.read_layers();
            let layers = guard.clone().ok_or_else(no_layers)?;
            (layers, self.cache.snapshot()?)
        };
        assemble(&self.source.bytes, &layers, &snapshot, opts)
    }
}

fn build_thread_pool(threads: Option<usize>) -> LayercraftResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LayercraftError::validation(
            "extraction 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| LayercraftError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
