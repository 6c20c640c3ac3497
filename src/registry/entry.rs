//! Data source entries and registry events

use std::sync::Arc;
use thiserror::Error;

use crate::fetch::FetchError;
use crate::library::LibraryError;
use crate::payload::{ParseError, Payload};

/// Fetch state of one distinct source url
#[derive(Debug, Clone)]
pub enum DataSourceEntry {
    /// Fetch issued, no payload yet
    Pending,
    /// Fetched and parsed
    Ready(Arc<Payload>),
    /// Fetch or parse failed; terminal
    Failed(Arc<SourceError>),
}

impl DataSourceEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, DataSourceEntry::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DataSourceEntry::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DataSourceEntry::Failed(_))
    }

    /// The payload, when ready
    pub fn payload(&self) -> Option<&Arc<Payload>> {
        match self {
            DataSourceEntry::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            DataSourceEntry::Pending => "pending",
            DataSourceEntry::Ready(_) => "ready",
            DataSourceEntry::Failed(_) => "failed",
        }
    }
}

/// Why a source ended up failed
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// Completion delivered to the registry's event loop
#[derive(Debug)]
pub enum RegistryEvent {
    /// A fetch finished, successfully or not
    SourceLoaded {
        url: String,
        outcome: Result<String, FetchError>,
    },
    /// The charting library finished its bootstrap
    LibraryReady,
    /// The charting library gave up; charts will never be drawn
    LibraryFailed(LibraryError),
}

/// Snapshot of registry state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub placeholders: usize,
    pub sources: usize,
    pub pending: usize,
    pub ready: usize,
    pub failed: usize,
    pub renders: usize,
    pub library_ready: bool,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Placeholders: {}, Sources: {} (pending {}, ready {}, failed {}), Renders: {}, Library: {}",
            self.placeholders,
            self.sources,
            self.pending,
            self.ready,
            self.failed,
            self.renders,
            if self.library_ready { "ready" } else { "loading" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_states() {
        let pending = DataSourceEntry::Pending;
        assert!(pending.is_pending());
        assert!(pending.payload().is_none());

        let failed = DataSourceEntry::Failed(Arc::new(FetchError::Timeout.into()));
        assert!(failed.is_failed());
        assert_eq!(failed.state_name(), "failed");
    }

    #[test]
    fn test_source_error_display() {
        let err: SourceError = FetchError::Timeout.into();
        assert_eq!(err.to_string(), "fetch failed: Request timeout");

        let err: SourceError = ParseError::NotAnObject.into();
        assert_eq!(err.to_string(), "parse failed: Payload is not a JSON object");
    }

    #[test]
    fn test_stats_display() {
        let stats = RegistryStats {
            placeholders: 3,
            sources: 2,
            pending: 0,
            ready: 1,
            failed: 1,
            renders: 2,
            library_ready: true,
        };
        assert_eq!(
            stats.to_string(),
            "Placeholders: 3, Sources: 2 (pending 0, ready 1, failed 1), Renders: 2, Library: ready"
        );
    }
}
