//! Charting Library
//!
//! The charting library bootstraps asynchronously and then hands out chart
//! objects by kind name. Each chart draws rows plus render options into
//! output that gets mounted on its placeholder.
//!
//! - [`ChartLibrary`] / [`Chart`]: the seams the registry talks to
//! - [`DataTable`]: rows converted to a header + typed values table
//! - [`SvgChartLibrary`]: built-in library drawing SVG with plotters

mod svg;
mod table;

pub use svg::{SvgChartLibrary, CORECHART_PACKAGE, SUPPORTED_KINDS};
pub use table::{DataRow, DataTable};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::document::ChartPlaceholder;
use crate::payload::Value;

/// A charting library with an asynchronous bootstrap
#[async_trait]
pub trait ChartLibrary: Send + Sync {
    /// Load the given packages; resolves once the library is ready to draw
    async fn load(&self, packages: &[String]) -> Result<(), LibraryError>;

    /// Construct a chart of kind `vis_kind` mounted on `placeholder`
    fn create(
        &self,
        vis_kind: &str,
        placeholder: &ChartPlaceholder,
    ) -> Result<Box<dyn Chart>, LibraryError>;
}

/// A drawable chart instance
pub trait Chart: Send {
    /// Draw `rows` using `options`
    fn draw(&mut self, rows: &Value, options: &Value) -> Result<RenderedChart, RenderError>;
}

/// Visual output of one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    pub vis_kind: String,
    pub svg: String,
}

/// Errors raised by the charting library itself
#[derive(Error, Debug, Clone)]
pub enum LibraryError {
    #[error("Unknown chart kind: {0}")]
    UnknownKind(String),

    #[error("Unknown library package: {0}")]
    UnknownPackage(String),

    #[error("Library failed to load: {0}")]
    LoadFailed(String),
}

/// Errors raised while rendering a chart
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Data source not ready: {0}")]
    SourceNotReady(String),

    #[error("Charting library not ready")]
    LibraryNotReady,

    #[error("Unknown placeholder: {0}")]
    UnknownPlaceholder(String),

    #[error("Invalid chart data: {0}")]
    InvalidData(String),

    #[error("Drawing failed: {0}")]
    Draw(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}
