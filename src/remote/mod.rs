//! Access to the external multimodal model.

pub(crate) mod client;
pub(crate) mod mock;
pub(crate) mod wire;
