/// Convenience result type used across layercraft.
pub type LayercraftResult<T> = Result<T, LayercraftError>;

/// Top-level error taxonomy shared by every pipeline stage.
///
/// Errors bubble to the immediate caller of a stage; nothing is retried internally.
#[derive(thiserror::Error, Debug)]
pub enum LayercraftError {
    /// The external model could not be reached or answered with a failure.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// The decomposition response did not match the required layer schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// An extraction response carried no usable image payload.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// Malformed image bytes (source image or cached cutout) or payload encoding.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid caller input or workflow misuse.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayercraftError {
    /// Build a [`LayercraftError::RemoteService`] value.
    pub fn remote_service(msg: impl Into<String>) -> Self {
        Self::RemoteService(msg.into())
    }

    /// Build a [`LayercraftError::SchemaViolation`] value.
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Build a [`LayercraftError::EmptyResult`] value.
    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    /// Build a [`LayercraftError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`LayercraftError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether re-invoking the same action can reasonably succeed.
    ///
    /// Remote failures and empty cutouts depend on the model's mood; schema, decode and validation
    /// failures are deterministic for the same input.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RemoteService(_) | Self::EmptyResult(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
