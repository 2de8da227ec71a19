//! Error types for the grid protocol library.
//!
//! This module defines error types for framing failures on the node
//! telemetry channel and for undecodable client envelopes.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a frame.
    #[error("invalid UTF-8 in frame at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from UTF-8 decoder.
        details: String,
    },

    /// Frame exceeded maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual frame length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// JSON body could not be decoded.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Framing errors leave the byte stream in an unknown state.
    ///
    /// A JSON error only affects the single frame it was found in.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Json(_))
    }
}
