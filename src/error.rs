//! Error types for the sourcetrace toolkit

use thiserror::Error;

/// Main error type for sourcetrace
#[derive(Error, Debug)]
pub enum Error {
    /// The VLQ `mappings` string could not be decoded
    #[error("malformed mappings: {message} at offset {offset}")]
    MalformedMappings {
        message: String,
        /// Byte offset into the `mappings` string where decoding failed
        offset: usize,
    },

    /// A 1-based query API was called with an out-of-range coordinate
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A source map referenced a source, name, or line that does not exist
    #[error("invalid source map: {0}")]
    InvalidMap(String),

    /// The envelope's `version` field is not 3
    #[error("unsupported source map version: {0}")]
    UnsupportedVersion(u32),

    /// The envelope JSON could not be parsed
    #[error("source map parsing failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a `MalformedMappings` error at the given byte offset.
    pub(crate) fn malformed(message: impl Into<String>, offset: usize) -> Self {
        Error::MalformedMappings {
            message: message.into(),
            offset,
        }
    }

    /// Create an `InvalidMap` error.
    pub(crate) fn invalid_map(message: impl Into<String>) -> Self {
        Error::InvalidMap(message.into())
    }
}

/// Result type alias for sourcetrace operations
pub type Result<T> = std::result::Result<T, Error>;
