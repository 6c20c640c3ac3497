//! Host Document
//!
//! The document is where chart placeholders are discovered and where
//! rendered charts are mounted. The registry never creates or removes
//! placeholders; mounting a chart is the only mutation it performs.

mod html;

pub use html::{scan_placeholders, VIS_KIND_ATTR, VIS_SRC_ATTR};

use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::library::{RenderError, RenderedChart};

/// An element designating where one chart is mounted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChartPlaceholder {
    /// Unique id within the document
    pub id: String,
    /// Chart kind, resolved against the charting library (e.g. "LineChart")
    pub vis_kind: String,
    /// Key of the data source feeding this chart
    pub source_url: String,
}

impl ChartPlaceholder {
    pub fn new(
        id: impl Into<String>,
        vis_kind: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vis_kind: vis_kind.into(),
            source_url: source_url.into(),
        }
    }
}

/// Discovery and render-target side of a page
pub trait Document: Send {
    /// All chart placeholders, in document order
    fn placeholders(&self) -> Vec<ChartPlaceholder>;

    /// Mount a rendered chart at the placeholder's position
    fn mount(
        &mut self,
        placeholder: &ChartPlaceholder,
        chart: RenderedChart,
    ) -> Result<(), RenderError>;
}

/// In-memory page: a fixed list of placeholders plus whatever was mounted on them
#[derive(Debug, Default)]
pub struct PageDocument {
    placeholders: Vec<ChartPlaceholder>,
    mounted: IndexMap<String, RenderedChart>,
}

impl PageDocument {
    /// Discover placeholders in an HTML page
    pub fn from_html(html: &str) -> Self {
        Self::from_placeholders(scan_placeholders(html))
    }

    /// Build a page from an explicit placeholder list
    pub fn from_placeholders(placeholders: Vec<ChartPlaceholder>) -> Self {
        Self {
            placeholders,
            mounted: IndexMap::new(),
        }
    }

    /// Charts mounted so far, keyed by placeholder id
    pub fn mounted(&self) -> &IndexMap<String, RenderedChart> {
        &self.mounted
    }

    /// Write every mounted chart to `<dir>/<placeholder id>.svg`
    pub async fn write_svgs(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;

        let mut written = Vec::with_capacity(self.mounted.len());
        for (id, chart) in &self.mounted {
            let path = dir.join(format!("{}.svg", file_stem(id)));
            tokio::fs::write(&path, chart.svg.as_bytes()).await?;
            written.push(path);
        }

        Ok(written)
    }
}

impl Document for PageDocument {
    fn placeholders(&self) -> Vec<ChartPlaceholder> {
        self.placeholders.clone()
    }

    fn mount(
        &mut self,
        placeholder: &ChartPlaceholder,
        chart: RenderedChart,
    ) -> Result<(), RenderError> {
        if !self.placeholders.iter().any(|p| p.id == placeholder.id) {
            return Err(RenderError::UnknownPlaceholder(placeholder.id.clone()));
        }

        // Re-drawing replaces the previous output
        self.mounted.insert(placeholder.id.clone(), chart);
        Ok(())
    }
}

/// Placeholder ids come from page markup; keep file names tame
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chart(svg: &str) -> RenderedChart {
        RenderedChart {
            vis_kind: "LineChart".to_string(),
            svg: svg.to_string(),
        }
    }

    #[test]
    fn test_mount_last_call_wins() {
        let p = ChartPlaceholder::new("a", "LineChart", "/a");
        let mut doc = PageDocument::from_placeholders(vec![p.clone()]);

        doc.mount(&p, chart("<svg>1</svg>")).unwrap();
        doc.mount(&p, chart("<svg>2</svg>")).unwrap();

        assert_eq!(doc.mounted().len(), 1);
        assert_eq!(doc.mounted()["a"].svg, "<svg>2</svg>");
    }

    #[test]
    fn test_mount_unknown_placeholder() {
        let mut doc = PageDocument::from_placeholders(vec![]);
        let stray = ChartPlaceholder::new("stray", "LineChart", "/a");
        assert!(matches!(
            doc.mount(&stray, chart("<svg/>")),
            Err(RenderError::UnknownPlaceholder(_))
        ));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("in-out_2014"), "in-out_2014");
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
    }

    #[tokio::test]
    async fn test_write_svgs() {
        let dir = tempdir().unwrap();
        let p = ChartPlaceholder::new("in-out", "ColumnChart", "/a");
        let mut doc = PageDocument::from_placeholders(vec![p.clone()]);
        doc.mount(&p, chart("<svg></svg>")).unwrap();

        let written = doc.write_svgs(&dir.path().join("charts")).await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&written[0]).unwrap(),
            "<svg></svg>"
        );
        assert!(written[0].ends_with("in-out.svg"));
    }
}
