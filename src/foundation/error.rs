/// Convenience result type used across cakecraft.
pub type CakeResult<T> = Result<T, CakeError>;

/// Top-level error taxonomy used by configurator APIs.
#[derive(thiserror::Error, Debug)]
pub enum CakeError {
    /// Invalid user input or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// An asset could not be located, read or decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// Errors while rasterizing decals or exporting scenes.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The request was cancelled before it completed.
    #[error("load cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CakeError {
    /// Build a [`CakeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CakeError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`CakeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`CakeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CakeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
