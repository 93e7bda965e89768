use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::error::{LayercraftError, LayercraftResult};

/// An encoded, transparent-background cutout returned by the extraction model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedImage {
    /// MIME type reported with the payload (e.g. `image/png`).
    pub mime_type: String,
    /// Encoded image bytes, shared between the cache and snapshots.
    pub data: Arc<[u8]>,
}

impl ExtractedImage {
    /// Wrap encoded bytes.
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Borrow the encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Extraction state of a single layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// No cutout cached and none in flight.
    NotExtracted,
    /// A request for this layer is in flight.
    Extracting,
    /// A cutout is cached.
    Extracted,
}

#[derive(Debug)]
enum Slot {
    Extracting,
    Extracted(ExtractedImage),
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    slots: BTreeMap<usize, Slot>,
}

/// Index-addressed cache of cutouts, owned by the workflow driving the pipeline.
///
/// Transitions per index: `NotExtracted -> Extracting -> Extracted` on success and
/// `NotExtracted -> Extracting -> NotExtracted` on failure. At most one extraction per index is in
/// flight; different indices are independent. [`ExtractionCache::reset`] bumps a generation
/// counter so that responses started before the reset are dropped instead of being written into
/// the new layer set.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    inner: Mutex<Inner>,
}

/// Outcome of [`ExtractionCache::begin`].
#[derive(Debug)]
pub enum BeginExtraction<'a> {
    /// The layer already has a cutout; no request should be made.
    Cached(ExtractedImage),
    /// The slot is now `Extracting`; the caller owns the request.
    Started(ExtractionTicket<'a>),
}

/// Exclusive right to fill one cache slot.
///
/// Dropping the ticket without completing it returns the slot to `NotExtracted`.
#[derive(Debug)]
pub struct ExtractionTicket<'a> {
    cache: &'a ExtractionCache,
    index: usize,
    generation: u64,
    settled: bool,
}

impl ExtractionTicket<'_> {
    /// Layer index this ticket covers.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Store the cutout. Returns `false` when the cache was reset since the ticket was issued and
    /// the result was discarded.
    pub fn complete(mut self, image: ExtractedImage) -> bool {
        self.settled = true;
        let mut inner = self.cache.lock();
        if inner.generation != self.generation {
            tracing::warn!(
                index = self.index,
                "discarding stale extraction result after cache reset"
            );
            return false;
        }
        inner.slots.insert(self.index, Slot::Extracted(image));
        true
    }

    /// Give the slot back without a result.
    pub fn abandon(mut self) {
        self.settled = true;
        self.release();
    }

    fn release(&self) {
        let mut inner = self.cache.lock();
        if inner.generation == self.generation
            && matches!(inner.slots.get(&self.index), Some(Slot::Extracting))
        {
            inner.slots.remove(&self.index);
        }
    }
}

impl Drop for ExtractionTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.release();
        }
    }
}

impl ExtractionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of `index`.
    pub fn status(&self, index: usize) -> ExtractionStatus {
        match self.lock().slots.get(&index) {
            None => ExtractionStatus::NotExtracted,
            Some(Slot::Extracting) => ExtractionStatus::Extracting,
            Some(Slot::Extracted(_)) => ExtractionStatus::Extracted,
        }
    }

    /// Cached cutout for `index`, if any.
    pub fn get(&self, index: usize) -> Option<ExtractedImage> {
        match self.lock().slots.get(&index) {
            Some(Slot::Extracted(img)) => Some(img.clone()),
            _ => None,
        }
    }

    /// Claim `index` for extraction, or return its cached cutout.
    ///
    /// Fails with a validation error when a request for `index` is already in flight.
    pub fn begin(&self, index: usize) -> LayercraftResult<BeginExtraction<'_>> {
        let mut inner = self.lock();
        match inner.slots.get(&index) {
            Some(Slot::Extracted(img)) => Ok(BeginExtraction::Cached(img.clone())),
            Some(Slot::Extracting) => Err(LayercraftError::validation(format!(
                "extraction for layer {index} is already in flight"
            ))),
            None => {
                inner.slots.insert(index, Slot::Extracting);
                Ok(BeginExtraction::Started(ExtractionTicket {
                    cache: self,
                    index,
                    generation: inner.generation,
                    settled: false,
                }))
            }
        }
    }

    /// Seed a cutout directly (e.g. one restored from disk).
    pub fn insert(&self, index: usize, image: ExtractedImage) {
        self.lock().slots.insert(index, Slot::Extracted(image));
    }

    /// Drop every slot and invalidate outstanding tickets.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.slots.clear();
    }

    /// Number of in-flight extractions.
    pub fn in_flight(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|s| matches!(s, Slot::Extracting))
            .count()
    }

    /// Immutable copy of the cached cutouts for assembly.
    ///
    /// Fails while any extraction is in flight so that assembly never sees a half-updated cache.
    pub fn snapshot(&self) -> LayercraftResult<ExtractionSnapshot> {
        let inner = self.lock();
        let mut images = BTreeMap::new();
        for (&index, slot) in &inner.slots {
            match slot {
                Slot::Extracted(img) => {
                    images.insert(index, img.clone());
                }
                Slot::Extracting => {
                    return Err(LayercraftError::validation(format!(
                        "cannot snapshot while extraction for layer {index} is in flight"
                    )));
                }
            }
        }
        Ok(ExtractionSnapshot { images })
    }
}

/// Read-only view of cached cutouts keyed by layer index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionSnapshot {
    images: BTreeMap<usize, ExtractedImage>,
}

impl ExtractionSnapshot {
    /// Empty snapshot (no cutouts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the cutout for `index`.
    pub fn insert(&mut self, index: usize, image: ExtractedImage) {
        self.images.insert(index, image);
    }

    /// Cutout for `index`, if cached.
    pub fn get(&self, index: usize) -> Option<&ExtractedImage> {
        self.images.get(&index)
    }

    /// Number of cached cutouts.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Return `true` when no cutouts are cached.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/cache.rs"]
mod tests;
