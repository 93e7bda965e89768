//! Layer model: decomposed layers, their normalized boxes and the cutout cache.

pub(crate) mod cache;
pub(crate) mod layer;
pub(crate) mod text;
