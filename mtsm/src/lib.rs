//! The mtsm client.
//!
//! Pushes [`TimeSeries`] to a Prometheus remote-write endpoint and
//! [`BulkMetric`] lines to a `VictoriaMetrics` style import endpoint, and wraps
//! the handful of query API calls whose results [`Clean`] normalizes. The
//! models and codecs themselves live in `mtsm_payload`, re-exported here.
//!
//! ## Metrics
//!
//! `requests_sent`: Total number of requests sent
//! `request_ok`: Requests answered with an accepted status
//! `request_failure`: Requests that failed in transport or were rejected
//! `bytes_written`: Total body bytes accepted by the backend
//!

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub use client::Client;
pub use config::Config;
pub use mtsm_payload::{
    Buckets, BulkMetric, Clean, LabelSet, Scalar, TimeSeries, TsMatrix, TsVector,
    query::{LabelValues, QueryResponse},
};

mod api;
pub mod client;
pub mod config;
mod push;
pub mod retry;

/// Errors produced by [`Client`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    /// Payload could not be built or encoded
    #[error("Payload error: {0}")]
    Payload(#[from] mtsm_payload::Error),
    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    /// Error making or reading an HTTP request
    #[error("Failed to send HTTP request to {url}: {source}")]
    Request {
        /// Target URL
        url: String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a status the operation does not accept
    #[error("Unexpected status code {status}, body: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether a wire push should try again after this error: transport
    /// failures, 429 and 5xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Request { .. } => true,
            Error::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn retryable_statuses() {
        let status = |status| Error::Status {
            status,
            body: String::new(),
        };
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }
}
