//! Error types for the pooled GET client.
//!
//! # Design
//! One variant per stage of a request: building it, putting it on the wire,
//! and draining the response body. Each carries the URL so a failure in a
//! busy process can be traced back to its call site. Failing to close a
//! response body is not an error here; it is logged and swallowed.

use std::io;

use thiserror::Error;

/// Boxed cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The URL is malformed or a header cannot be put on the wire.
    #[error("error creating request for url [{url}]: {reason}")]
    RequestBuildError { url: String, reason: String },

    /// Connection, TLS, or timeout failure before a response arrived.
    #[error("error executing request for url [{url}]: {source}")]
    RequestExecutionError {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The response arrived but its body could not be read to the end.
    #[error("error reading response body for url [{url}]: {source}")]
    BodyReadError {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl ClientError {
    pub(crate) fn build(url: &str, reason: impl Into<String>) -> Self {
        ClientError::RequestBuildError {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn execution(url: &str, source: impl Into<BoxError>) -> Self {
        ClientError::RequestExecutionError {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// The URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            ClientError::RequestBuildError { url, .. }
            | ClientError::RequestExecutionError { url, .. }
            | ClientError::BodyReadError { url, .. } => url,
        }
    }
}
