//! SVG chart library
//!
//! Draws the `corechart` kinds with plotters' SVG backend. Column 0 of the
//! data table becomes the category axis; each further column is one series.

use async_trait::async_trait;
use plotters::prelude::*;

use super::{Chart, ChartLibrary, DataTable, LibraryError, RenderError, RenderedChart};
use crate::document::ChartPlaceholder;
use crate::payload::Value;

/// The only package this library provides
pub const CORECHART_PACKAGE: &str = "corechart";

/// Chart kinds understood by [`SvgChartLibrary`]
pub const SUPPORTED_KINDS: &[&str] = &["LineChart", "AreaChart", "ColumnChart"];

/// Default series colors
const PALETTE: [RGBColor; 6] = [
    RGBColor(0x33, 0x66, 0xCC), // Blue
    RGBColor(0xDC, 0x39, 0x12), // Red
    RGBColor(0xFF, 0x99, 0x00), // Orange
    RGBColor(0x10, 0x96, 0x18), // Green
    RGBColor(0x99, 0x00, 0x99), // Purple
    RGBColor(0x00, 0x99, 0xC6), // Cyan
];

const MIN_DIMENSION: u32 = 64;
const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Line,
    Area,
    Column,
}

impl Kind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "LineChart" => Some(Kind::Line),
            "AreaChart" => Some(Kind::Area),
            "ColumnChart" => Some(Kind::Column),
            _ => None,
        }
    }
}

/// Built-in charting library rendering to SVG
#[derive(Debug, Clone)]
pub struct SvgChartLibrary {
    width: u32,
    height: u32,
}

impl SvgChartLibrary {
    /// Create a library whose charts default to `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(MIN_DIMENSION, MAX_DIMENSION),
            height: height.clamp(MIN_DIMENSION, MAX_DIMENSION),
        }
    }
}

impl Default for SvgChartLibrary {
    fn default() -> Self {
        Self::new(800, 400)
    }
}

#[async_trait]
impl ChartLibrary for SvgChartLibrary {
    async fn load(&self, packages: &[String]) -> Result<(), LibraryError> {
        if let Some(unknown) = packages.iter().find(|p| *p != CORECHART_PACKAGE) {
            return Err(LibraryError::UnknownPackage(unknown.clone()));
        }

        // Nothing to download; readiness still arrives on a later turn
        tokio::task::yield_now().await;
        tracing::debug!(packages = ?packages, "Chart library loaded");
        Ok(())
    }

    fn create(
        &self,
        vis_kind: &str,
        placeholder: &ChartPlaceholder,
    ) -> Result<Box<dyn Chart>, LibraryError> {
        let kind = Kind::from_name(vis_kind)
            .ok_or_else(|| LibraryError::UnknownKind(vis_kind.to_string()))?;

        tracing::trace!(placeholder = %placeholder.id, kind = vis_kind, "Creating chart");

        Ok(Box::new(SvgChart {
            kind,
            vis_kind: vis_kind.to_string(),
            width: self.width,
            height: self.height,
        }))
    }
}

struct SvgChart {
    kind: Kind,
    vis_kind: String,
    width: u32,
    height: u32,
}

impl Chart for SvgChart {
    fn draw(&mut self, rows: &Value, options: &Value) -> Result<RenderedChart, RenderError> {
        let table = DataTable::from_rows(rows)?;
        let opts = DrawOptions::from_value(options, self.width, self.height);
        let svg = draw_svg(self.kind, &table, &opts)?;

        Ok(RenderedChart {
            vis_kind: self.vis_kind.clone(),
            svg,
        })
    }
}

/// Render options this library honours
#[derive(Debug, Clone, PartialEq)]
struct DrawOptions {
    title: String,
    width: u32,
    height: u32,
    colors: Vec<RGBColor>,
}

impl DrawOptions {
    fn from_value(options: &Value, width: u32, height: u32) -> Self {
        let dimension = |key: &str, fallback: u32| {
            options
                .get(key)
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite() && *v > 0.0)
                .map(|v| (v as u32).clamp(MIN_DIMENSION, MAX_DIMENSION))
                .unwrap_or(fallback)
        };

        let colors = options
            .get("colors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(parse_hex_color)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: options
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            width: dimension("width", width),
            height: dimension("height", height),
            colors,
        }
    }

    fn color(&self, series: usize) -> RGBColor {
        if self.colors.is_empty() {
            PALETTE[series % PALETTE.len()]
        } else {
            self.colors[series % self.colors.len()]
        }
    }
}

/// `#RRGGBB` or `#RGB`
fn parse_hex_color(s: &str) -> Option<RGBColor> {
    let hex = s.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |h: &str| u8::from_str_radix(h, 16).ok();

    match hex.len() {
        6 => Some(RGBColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(RGBColor(short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

/// Value axis bounds; always includes zero so columns and areas have a baseline
fn value_bounds(range: Option<(f64, f64)>) -> (f64, f64) {
    let (lo, hi) = range.unwrap_or((0.0, 1.0));
    let lo = lo.min(0.0);
    let mut hi = hi.max(0.0);
    if hi - lo < f64::EPSILON {
        hi = lo + 1.0;
    }
    (lo, hi + (hi - lo) * 0.05)
}

fn draw_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

fn draw_svg(kind: Kind, table: &DataTable, opts: &DrawOptions) -> Result<String, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (opts.width, opts.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let slots = table.rows.len().max(1);
        let (lo, hi) = value_bounds(table.value_range());
        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();

        let mut builder = ChartBuilder::on(&root);
        builder.margin(12).x_label_area_size(32).y_label_area_size(56);
        if !opts.title.is_empty() {
            builder.caption(opts.title.as_str(), ("sans-serif", 18));
        }
        let mut chart = builder
            .build_cartesian_2d(-0.5f64..(slots as f64 - 0.5), lo..hi)
            .map_err(draw_err)?;

        let label_at = |x: &f64| -> String {
            let i = x.round();
            if (x - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).map(|s| s.to_string()).unwrap_or_default()
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slots.min(12))
            .x_label_formatter(&label_at)
            .x_desc(table.columns[0].as_str())
            .draw()
            .map_err(draw_err)?;

        let series_count = table.series_names().len();
        let column_width = 0.8 / series_count as f64;

        for (s, name) in table.series_names().iter().enumerate() {
            let color = opts.color(s);
            let points: Vec<(f64, f64)> = table
                .rows
                .iter()
                .enumerate()
                .filter_map(|(i, row)| row.values[s].map(|v| (i as f64, v)))
                .collect();

            let anno = match kind {
                Kind::Line => chart.draw_series(LineSeries::new(points, color.stroke_width(2))),
                Kind::Area => chart.draw_series(
                    AreaSeries::new(points, 0.0, color.mix(0.3)).border_style(color),
                ),
                Kind::Column => {
                    let offset = -0.4 + column_width * s as f64;
                    chart.draw_series(points.into_iter().map(|(x, v)| {
                        Rectangle::new(
                            [(x + offset, 0.0), (x + offset + column_width, v)],
                            color.filled(),
                        )
                    }))
                }
            }
            .map_err(draw_err)?;

            anno.label(name.as_str()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    Ok(svg)
}
