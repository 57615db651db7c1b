//! Shared error type for the provider: URL handling, HTTP, decoding, and selectors.

use thiserror::Error;

/// Errors surfaced by provider operations. Per-record and per-endpoint failures are
/// absorbed by the fallback logic and never reach this type.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "search", "novel 123") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    #[error("Could not decode API response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}
