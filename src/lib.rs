//! # Datavis
//!
//! Chart loader for server-rendered finance pages. Pages mark chart
//! positions with `data-vis` (chart kind) and `data-vis-src` (data source
//! url). Datavis fetches every distinct source once, waits for the charting
//! library to finish loading, and draws each chart as soon as both its data
//! and the library are ready.
//!
//! ## Modules
//!
//! - [`registry`]: source bookkeeping and the render gate
//! - [`payload`]: response parsing with timestamp detection
//! - [`fetch`]: data source fetching over HTTP or from disk
//! - [`document`]: placeholder discovery and chart mounting
//! - [`library`]: charting library seam and the built-in SVG library
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use datavis::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let html = std::fs::read_to_string("month.html")?;
//!
//!     let mut registry = ChartDataRegistry::new(
//!         PageDocument::from_html(&html),
//!         Arc::new(HttpFetcher::new(FetchConfig {
//!             base_url: Some("http://localhost:8000/".to_string()),
//!             ..FetchConfig::default()
//!         })?),
//!         Arc::new(SvgChartLibrary::default()),
//!         RegistryConfig::default(),
//!     );
//!
//!     registry.discover_and_load();
//!     registry.run_until_idle().await;
//!     println!("{}", registry.stats());
//!
//!     registry.into_document().write_svgs("charts".as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod library;
pub mod payload;
pub mod registry;

pub use config::{Config, ConfigError, LoggingConfig};

pub use document::{ChartPlaceholder, Document, PageDocument};

pub use error::{DatavisError, DatavisResult};

pub use fetch::{DataFetcher, FetchConfig, FetchError, HttpFetcher};

pub use library::{
    Chart, ChartLibrary, DataTable, LibraryError, RenderError, RenderedChart, SvgChartLibrary,
};

pub use payload::{ParseError, Payload, Value};

pub use registry::{
    ChartDataRegistry, DataSourceEntry, RegistryConfig, RegistryEvent, RegistryStats,
    SourceError,
};
