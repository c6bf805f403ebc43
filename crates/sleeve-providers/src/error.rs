// SPDX-License-Identifier: GPL-3.0-or-later

use reqwest::StatusCode;
use thiserror::Error;

use crate::rate_limiter::QueueError;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure inside a provider adapter. Never leaves the adapter: it is logged
/// and turned into "no result" at the adapter boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or protocol failure while performing the request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a non-success status code.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    /// A 2xx payload that carries an API-level error message.
    #[error("API error: {message}")]
    Api { message: String },
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("Missing expected field: {0}")]
    MissingField(&'static str),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ProviderError {
    /// Whether the provider simply has nothing for the query.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status == StatusCode::NOT_FOUND,
            Self::Api { message } => {
                let message = message.to_lowercase();
                message.contains("not found")
                    || message.contains("could not be found")
                    || message == "no data"
            }
            _ => false,
        }
    }
}
