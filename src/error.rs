//! Crate-level error type
//!
//! Per-module errors stay where they are raised; this enum lets callers
//! outside the registry use `?` across module boundaries.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::library::{LibraryError, RenderError};
use crate::payload::ParseError;

#[derive(Error, Debug)]
pub enum DatavisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DatavisResult<T> = Result<T, DatavisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: DatavisError = FetchError::Timeout.into();
        assert!(matches!(err, DatavisError::Fetch(_)));
        assert_eq!(err.to_string(), "Request timeout");

        let err: DatavisError = RenderError::LibraryNotReady.into();
        assert_eq!(err.to_string(), "Charting library not ready");
    }
}
