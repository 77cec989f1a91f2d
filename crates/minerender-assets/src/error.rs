//! Error types for the minerender-assets crate.

use std::fmt;

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving assets.
///
/// A missing asset is not an error: services report it as `None`. These
/// variants cover transport, storage and data faults. The type is `Clone` so a
/// cached failure can be handed to every caller waiting on the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code other than 404.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// Reading an asset from disk failed for a reason other than absence.
    Io {
        /// The path that failed.
        path: String,
        /// The error message.
        message: String,
    },
    /// Durable store operation failed.
    Store {
        /// The operation that failed.
        operation: &'static str,
        /// The error message.
        message: String,
    },
    /// Serializing or deserializing a value failed.
    Serialization {
        /// Context for where the error occurred.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Image decoding failed.
    Decode {
        /// The serialized key of the asset.
        key: String,
        /// The error message.
        message: String,
    },
    /// An asset key contained characters outside the resource location set.
    InvalidKey {
        /// Which field was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            Error::Store { operation, message } => {
                write!(f, "store {operation} failed: {message}")
            }
            Error::Serialization { context, message } => {
                write!(f, "failed to serialize {context}: {message}")
            }
            Error::Decode { key, message } => {
                write!(f, "failed to decode image {key}: {message}")
            }
            Error::InvalidKey { field, value } => {
                write!(f, "invalid asset key {field}: {value:?}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            context: "json",
            message: e.to_string(),
        }
    }
}
