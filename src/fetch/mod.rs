//! Data Source Fetching
//!
//! A data source is fetched once as plain text; parsing into a
//! [`Payload`](crate::payload::Payload) happens on the registry side.

mod http;

pub use http::{FetchConfig, HttpFetcher};

use async_trait::async_trait;
use thiserror::Error;

/// Retrieves the raw body of a data source
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Fetch the body at `url` as text
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Errors that can occur while fetching a data source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid source url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Source unavailable")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
