//! Error types for the minerender-world crate.

use std::fmt;

use glam::IVec3;

/// Result type for world operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mutating or querying a world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A block coordinate lies outside the world.
    OutOfBounds {
        /// The rejected position.
        position: IVec3,
        /// Exclusive upper bound on every axis.
        limit: i32,
    },
    /// Asset resolution failed.
    Asset(minerender_assets::Error),
    /// A scene object failed to initialise.
    Init {
        /// What was being initialised.
        object: String,
        /// The error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfBounds { position, limit } => {
                write!(
                    f,
                    "position {position} is outside the world (each axis must be in 0..{limit})"
                )
            }
            Error::Asset(e) => write!(f, "asset error: {e}"),
            Error::Init { object, message } => {
                write!(f, "failed to initialise {object}: {message}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Asset(e) => Some(e),
            _ => None,
        }
    }
}

impl From<minerender_assets::Error> for Error {
    fn from(e: minerender_assets::Error) -> Self {
        Error::Asset(e)
    }
}
