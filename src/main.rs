//! Datavis CLI
//!
//! Renders the charts of a finance page headlessly:
//! - Discover chart placeholders on a page
//! - Fetch their data sources and draw every chart to SVG
//! - Generate a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use datavis::config::{generate_default_config, Config, LoggingConfig};
use datavis::document::{ChartPlaceholder, PageDocument};
use datavis::fetch::HttpFetcher;
use datavis::library::SvgChartLibrary;
use datavis::registry::ChartDataRegistry;

#[derive(Parser)]
#[command(name = "datavis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Render the charts of a finance page to SVG")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every data source on a page and render its charts
    Render {
        /// Page url or path to a saved HTML file
        page: String,
        /// Output directory for SVG files
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Base url for relative data sources (default: the page url)
        #[arg(long)]
        base_url: Option<String>,
        /// Draw each chart at most once
        #[arg(long)]
        render_once: bool,
    },

    /// List the chart placeholders on a page
    Discover {
        /// Page url or path to a saved HTML file
        page: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Outcome for one placeholder after rendering
#[derive(Debug, Serialize)]
struct PlaceholderReport {
    id: String,
    kind: String,
    source: String,
    state: &'static str,
    rendered: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    match cli.command {
        Commands::Render {
            page,
            out,
            base_url,
            render_once,
        } => {
            if let Some(url) = base_url {
                config.fetch.base_url = Some(url);
            }
            if config.fetch.base_url.is_none() && is_http(&page) {
                config.fetch.base_url = Some(page.clone());
            }
            if render_once {
                config.render.render_once = true;
            }
            let out = out.unwrap_or_else(|| PathBuf::from(&config.render.output_dir));

            render(&config, &page, out, &cli.format).await?;
        }

        Commands::Discover { page } => {
            let fetcher = HttpFetcher::new(config.fetch_config())?;
            let html = fetcher
                .fetch_page(&page)
                .await
                .with_context(|| format!("failed to load page {}", page))?;
            let placeholders = datavis::document::scan_placeholders(&html);

            print_placeholders(&placeholders, &cli.format)?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("datavis={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn is_http(page: &str) -> bool {
    page.starts_with("http://") || page.starts_with("https://")
}

async fn render(config: &Config, page: &str, out: PathBuf, format: &str) -> anyhow::Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_config())?);
    let html = fetcher
        .fetch_page(page)
        .await
        .with_context(|| format!("failed to load page {}", page))?;

    let document = PageDocument::from_html(&html);
    let library = Arc::new(SvgChartLibrary::new(
        config.library.width,
        config.library.height,
    ));

    let mut registry =
        ChartDataRegistry::new(document, fetcher, library, config.registry_config());
    registry.discover_and_load();

    let settle = Duration::from_secs(config.render.settle_timeout_secs);
    if tokio::time::timeout(settle, registry.run_until_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            outstanding = registry.outstanding(),
            "Gave up waiting for outstanding data sources after {:?}",
            settle
        );
    }

    let stats = registry.stats();
    tracing::info!("Registry stats: {}", stats);

    let mounted: Vec<String> = registry.document().mounted().keys().cloned().collect();
    let reports: Vec<PlaceholderReport> = registry
        .placeholders()
        .iter()
        .map(|p| PlaceholderReport {
            id: p.id.clone(),
            kind: p.vis_kind.clone(),
            source: p.source_url.clone(),
            state: registry
                .entry(&p.source_url)
                .map(|e| e.state_name())
                .unwrap_or("unknown"),
            rendered: mounted.contains(&p.id),
        })
        .collect();

    let document = registry.into_document();
    let written = document
        .write_svgs(&out)
        .await
        .with_context(|| format!("failed to write charts to {:?}", out))?;

    match format {
        "json" => {
            let body = serde_json::json!({
                "charts": reports,
                "written": written,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        _ => {
            if reports.is_empty() {
                println!("No chart placeholders found on {}", page);
                return Ok(());
            }

            println!(
                "{:<20} {:<14} {:<10} {:<9} {}",
                "Chart", "Kind", "State", "Rendered", "Source"
            );
            println!("{}", "-".repeat(80));
            for r in &reports {
                println!(
                    "{:<20} {:<14} {:<10} {:<9} {}",
                    r.id,
                    r.kind,
                    r.state,
                    if r.rendered { "yes" } else { "no" },
                    r.source
                );
            }
            println!();
            println!("{}", stats);
            println!("Wrote {} chart(s) to {:?}", written.len(), out);
        }
    }

    Ok(())
}

fn print_placeholders(placeholders: &[ChartPlaceholder], format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(placeholders)?),
        _ => {
            if placeholders.is_empty() {
                println!("No chart placeholders found.");
                return Ok(());
            }

            println!("{:<20} {:<14} {}", "Chart", "Kind", "Source");
            println!("{}", "-".repeat(60));
            for p in placeholders {
                println!("{:<20} {:<14} {}", p.id, p.vis_kind, p.source_url);
            }
        }
    }

    Ok(())
}
