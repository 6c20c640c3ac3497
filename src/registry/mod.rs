//! Chart Data Registry
//!
//! Owns the mapping from data source url to fetch state and decides when a
//! chart may be drawn. A chart is drawn once both of its gates are open:
//!
//! - its data source is `Ready`
//! - the charting library has reported itself ready
//!
//! whichever opens last triggers the render.
//!
//! ## Event flow
//!
//! 1. [`ChartDataRegistry::discover_and_load`] scans the document, issues one
//!    fetch per distinct source and asks the library to load
//! 2. Fetches and the library load run as tokio tasks and report back as
//!    [`RegistryEvent`]s over an mpsc channel
//! 3. [`ChartDataRegistry::step`] / [`ChartDataRegistry::run_until_idle`] apply
//!    events one at a time, so every entry has a single writer and no handler
//!    ever observes another one half-way through

mod entry;

pub use entry::{DataSourceEntry, RegistryEvent, RegistryStats, SourceError};

use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::document::{ChartPlaceholder, Document, PageDocument};
use crate::fetch::{DataFetcher, FetchError};
use crate::library::{ChartLibrary, RenderError, CORECHART_PACKAGE};
use crate::payload::Payload;

/// Registry behaviour knobs
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Packages requested from the charting library
    pub packages: Vec<String>,
    /// Draw each placeholder at most once, ignoring later triggers
    pub render_once: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            packages: vec![CORECHART_PACKAGE.to_string()],
            render_once: false,
        }
    }
}

/// Coordinates source fetches, library readiness and chart rendering for one document
pub struct ChartDataRegistry<D = PageDocument> {
    document: D,
    fetcher: Arc<dyn DataFetcher>,
    library: Arc<dyn ChartLibrary>,
    config: RegistryConfig,
    /// Known placeholders in document order
    placeholders: Vec<ChartPlaceholder>,
    /// Source url -> state, in first-seen order
    sources: IndexMap<String, DataSourceEntry>,
    library_requested: bool,
    library_ready: bool,
    rendered: HashSet<String>,
    renders: usize,
    /// Fetches and library loads issued but not yet reported back
    outstanding: usize,
    events_tx: mpsc::UnboundedSender<RegistryEvent>,
    events_rx: mpsc::UnboundedReceiver<RegistryEvent>,
}

impl<D: Document> ChartDataRegistry<D> {
    /// Create a registry for `document`
    pub fn new(
        document: D,
        fetcher: Arc<dyn DataFetcher>,
        library: Arc<dyn ChartLibrary>,
        config: RegistryConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            document,
            fetcher,
            library,
            config,
            placeholders: Vec::new(),
            sources: IndexMap::new(),
            library_requested: false,
            library_ready: false,
            rendered: HashSet::new(),
            renders: 0,
            outstanding: 0,
            events_tx,
            events_rx,
        }
    }

    /// Scan the document, fetch every source not seen before and request the library
    ///
    /// Fire-and-forget: completions are applied by [`step`](Self::step) or
    /// [`run_until_idle`](Self::run_until_idle). Must be called inside a tokio runtime.
    pub fn discover_and_load(&mut self) {
        let found = self.document.placeholders();
        if found.is_empty() {
            tracing::debug!("No chart placeholders in document");
            return;
        }

        tracing::info!(placeholders = found.len(), "Loading data sources");

        let mut late: Vec<ChartPlaceholder> = Vec::new();

        for placeholder in found {
            let url = placeholder.source_url.clone();
            let is_new = !self.placeholders.iter().any(|p| p.id == placeholder.id);

            match self.sources.get(&url) {
                Some(entry) => {
                    // Both gates may already be open; no later event would draw it.
                    if is_new && self.library_ready && entry.is_ready() {
                        late.push(placeholder.clone());
                    }
                }
                None => {
                    self.sources.insert(url.clone(), DataSourceEntry::Pending);
                    self.spawn_fetch(url);
                }
            }

            if is_new {
                self.placeholders.push(placeholder);
            }
        }

        for placeholder in &late {
            self.render_logged(placeholder);
        }

        if !self.library_requested {
            self.library_requested = true;
            self.spawn_library_load();
        }
    }

    fn spawn_fetch(&mut self, url: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.events_tx.clone();
        self.outstanding += 1;

        tracing::debug!(source = %url, "Fetching data source");
        tokio::spawn(async move {
            let outcome = fetcher.fetch_text(&url).await;
            let _ = tx.send(RegistryEvent::SourceLoaded { url, outcome });
        });
    }

    fn spawn_library_load(&mut self) {
        let library = Arc::clone(&self.library);
        let packages = self.config.packages.clone();
        let tx = self.events_tx.clone();
        self.outstanding += 1;

        tracing::debug!(packages = ?packages, "Requesting chart library");
        tokio::spawn(async move {
            let event = match library.load(&packages).await {
                Ok(()) => RegistryEvent::LibraryReady,
                Err(e) => RegistryEvent::LibraryFailed(e),
            };
            let _ = tx.send(event);
        });
    }

    /// Wait for the next completion and apply it
    ///
    /// Returns `false` without waiting when nothing is outstanding.
    pub async fn step(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }

        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply completions until every issued fetch and the library load have reported back
    ///
    /// A fetch that never completes keeps this pending; callers wanting a
    /// bound wrap it in `tokio::time::timeout`.
    pub async fn run_until_idle(&mut self) {
        while self.step().await {}
        tracing::debug!(stats = %self.stats(), "Registry idle");
    }

    /// Apply one completion event
    pub fn handle_event(&mut self, event: RegistryEvent) {
        self.outstanding = self.outstanding.saturating_sub(1);

        match event {
            RegistryEvent::SourceLoaded { url, outcome } => {
                self.on_source_loaded(&url, outcome)
            }
            RegistryEvent::LibraryReady => self.on_library_ready(),
            RegistryEvent::LibraryFailed(e) => {
                tracing::error!(error = %e, "Chart library failed to load; no chart will be drawn");
            }
        }
    }

    /// Fetch completion: move the source out of `Pending`
    ///
    /// Draws the source's charts right away when the library is already ready.
    pub fn on_source_loaded(&mut self, url: &str, outcome: Result<String, FetchError>) {
        match self.sources.get(url) {
            None => {
                tracing::warn!(source = %url, "Completion for unknown data source ignored");
                return;
            }
            Some(entry) if !entry.is_pending() => {
                tracing::warn!(
                    source = %url,
                    state = entry.state_name(),
                    "Repeated completion for data source ignored"
                );
                return;
            }
            Some(_) => {}
        }

        let parsed = outcome
            .map_err(SourceError::from)
            .and_then(|text| Payload::parse(&text).map_err(SourceError::from));

        match parsed {
            Ok(payload) => {
                tracing::info!(source = %url, "Loading source completed");
                self.sources
                    .insert(url.to_string(), DataSourceEntry::Ready(Arc::new(payload)));

                if self.library_ready {
                    self.render_source(url);
                } else {
                    tracing::debug!(source = %url, "Chart library not ready; render deferred");
                }
            }
            Err(err) => {
                tracing::error!(source = %url, error = %err, "Loading source failed");
                self.sources
                    .insert(url.to_string(), DataSourceEntry::Failed(Arc::new(err)));
            }
        }
    }

    /// Library readiness: draw every placeholder whose source is already `Ready`
    ///
    /// Each call re-draws all of them again; use `render_once` to suppress repeats.
    pub fn on_library_ready(&mut self) {
        if self.library_ready {
            tracing::debug!("Chart library signalled ready again");
        } else {
            tracing::info!("Chart library ready");
        }
        self.library_ready = true;

        let ready: Vec<ChartPlaceholder> = self
            .placeholders
            .iter()
            .filter(|p| {
                self.sources
                    .get(&p.source_url)
                    .map_or(false, DataSourceEntry::is_ready)
            })
            .cloned()
            .collect();

        for placeholder in &ready {
            self.render_logged(placeholder);
        }
    }

    fn render_source(&mut self, url: &str) {
        let bound: Vec<ChartPlaceholder> = self
            .placeholders
            .iter()
            .filter(|p| p.source_url == url)
            .cloned()
            .collect();

        for placeholder in &bound {
            self.render_logged(placeholder);
        }
    }

    fn render_logged(&mut self, placeholder: &ChartPlaceholder) {
        if let Err(e) = self.render(placeholder) {
            tracing::error!(
                placeholder = %placeholder.id,
                source = %placeholder.source_url,
                error = %e,
                "Chart render failed"
            );
        }
    }

    /// Draw one placeholder from its source payload and mount the result
    ///
    /// Refuses while either gate is closed. Calling it again re-draws.
    pub fn render(&mut self, placeholder: &ChartPlaceholder) -> Result<(), RenderError> {
        if !self.library_ready {
            return Err(RenderError::LibraryNotReady);
        }

        let payload = self
            .sources
            .get(&placeholder.source_url)
            .and_then(DataSourceEntry::payload)
            .cloned()
            .ok_or_else(|| RenderError::SourceNotReady(placeholder.source_url.clone()))?;

        if self.config.render_once && self.rendered.contains(&placeholder.id) {
            tracing::trace!(placeholder = %placeholder.id, "Already rendered; skipping");
            return Ok(());
        }

        let mut chart = self.library.create(&placeholder.vis_kind, placeholder)?;
        let output = chart.draw(&payload.rows, &payload.render_options)?;
        self.document.mount(placeholder, output)?;

        self.rendered.insert(placeholder.id.clone());
        self.renders += 1;

        tracing::debug!(
            placeholder = %placeholder.id,
            kind = %placeholder.vis_kind,
            source = %placeholder.source_url,
            "Chart rendered"
        );
        Ok(())
    }

    /// State of one source
    pub fn entry(&self, url: &str) -> Option<&DataSourceEntry> {
        self.sources.get(url)
    }

    /// Known placeholders, in document order
    pub fn placeholders(&self) -> &[ChartPlaceholder] {
        &self.placeholders
    }

    pub fn is_library_ready(&self) -> bool {
        self.library_ready
    }

    /// Fetches and library loads still in flight
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn into_document(self) -> D {
        self.document
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            placeholders: self.placeholders.len(),
            sources: self.sources.len(),
            renders: self.renders,
            library_ready: self.library_ready,
            ..RegistryStats::default()
        };

        for entry in self.sources.values() {
            match entry {
                DataSourceEntry::Pending => stats.pending += 1,
                DataSourceEntry::Ready(_) => stats.ready += 1,
                DataSourceEntry::Failed(_) => stats.failed += 1,
            }
        }

        stats
    }
}
