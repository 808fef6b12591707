//! Error types for vertex_stream
//!
//! This module defines the recoverable error types used by the buffer layer:
//! device failures, buffer creation, and render context access.
//! Caller contract violations (out-of-range regions, rewriting static buffers)
//! are assertions, not errors.

use std::fmt;

/// Result type for vertex_stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// vertex_stream errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device call failed, context unavailable, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource description (zero capacity, bad ring multiplier, etc.)
    InvalidResource(String),

    /// Initialization failed (render context, device)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
