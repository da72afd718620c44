//! Error types for the cache node
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Frame Error Enum ==
/// Reasons a datagram is rejected by the frame decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the fixed 6-byte header
    #[error("frame too short: {0} bytes, header needs 6")]
    Truncated(usize),

    /// Declared key length runs past the end of the buffer
    #[error("declared key length {declared} exceeds remaining {remaining} bytes")]
    LengthOverflow { declared: usize, remaining: usize },

    /// Key bytes are not valid UTF-8
    #[error("key is not valid UTF-8")]
    InvalidKey,

    /// Key does not fit the 16-bit length field
    #[error("key of {0} bytes does not fit a 16-bit length")]
    KeyTooLong(usize),
}

// == Cache Error Enum ==
/// Unified error type for the cache node.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not resident in the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The forward id counter wrapped onto an id that is still pending
    #[error("Forward id {0} is still pending after counter wrap")]
    ForwardIdExhausted(u32),

    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidConfig(_)
            | CacheError::ForwardIdExhausted(_)
            | CacheError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache node.
pub type Result<T> = std::result::Result<T, CacheError>;
