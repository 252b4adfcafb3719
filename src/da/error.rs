//! Tipos de erro do cliente Design Automation.
//!
//! [`ApiError`] separa respostas não-2xx da API, falhas no upload do bundle,
//! corpos que não puderam ser decodificados e falhas de transporte do
//! `reqwest`.

use thiserror::Error;

/// Errors returned by [`DaClient`](super::DaClient) operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status. `body` is the raw response text.
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },

    /// The multipart upload of the bundle archive was rejected.
    #[error("upload failed (status {status}): {body}")]
    Upload { status: u16, body: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("failed to parse API response: {0}")]
    Parse(String),

    /// DNS, connection, TLS or socket timeout failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::Upload { status, .. } => Some(*status),
            ApiError::Parse(_) | ApiError::Network(_) => None,
        }
    }
}
