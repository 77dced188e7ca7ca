//! Error types for the Galaxy3D scene culling core
//!
//! Invalid handles are treated as no-ops by the scene API (the caller may
//! race attach/detach across frame boundaries). The variants here cover the few
//! operations that genuinely fail: configuration, naming, and backend submission.

use std::fmt;

/// Result type for scene culling operations
pub type Result<T> = std::result::Result<T, Error>;

/// Scene culling errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Rejected configuration value
    InvalidConfig(String),

    /// A named object with the same name already exists
    AlreadyExists(String),

    /// Error reported by the rendering backend
    BackendError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
