//! HTML placeholder scanner
//!
//! Walks the tags of a server-rendered page and collects every element
//! carrying both `data-vis` and `data-vis-src`. Pages are HTML rather than
//! XML, so the reader runs without end-name checks and reads attributes in
//! HTML mode (unquoted values, bare flags).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;

use super::ChartPlaceholder;

/// Attribute naming the chart kind
pub const VIS_KIND_ATTR: &str = "data-vis";
/// Attribute naming the data source url
pub const VIS_SRC_ATTR: &str = "data-vis-src";

/// Scan `html` for chart placeholders in document order
///
/// Markup the reader cannot make sense of ends the scan; placeholders found
/// before that point are kept.
pub fn scan_placeholders(html: &str) -> Vec<ChartPlaceholder> {
    let mut reader = Reader::from_str(html);
    reader.check_end_names(false);

    let mut placeholders = Vec::new();
    let mut used_ids = HashSet::new();
    let mut index = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => {
                let Some(attrs) = chart_attributes(&tag) else {
                    continue;
                };
                index += 1;

                match attrs {
                    ChartAttrs {
                        kind: Some(vis_kind),
                        src: Some(source_url),
                        id,
                    } => {
                        let id = unique_id(id, index, &mut used_ids);
                        placeholders.push(ChartPlaceholder {
                            id,
                            vis_kind,
                            source_url,
                        });
                    }
                    ChartAttrs { kind, src, .. } => {
                        tracing::debug!(
                            kind = ?kind,
                            src = ?src,
                            "Skipping element with incomplete chart attributes"
                        );
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "Stopping placeholder scan on malformed markup"
                );
                break;
            }
        }
    }

    placeholders
}

struct ChartAttrs {
    kind: Option<String>,
    src: Option<String>,
    id: Option<String>,
}

/// Chart-related attributes of a tag, or `None` when it has neither
fn chart_attributes(tag: &BytesStart<'_>) -> Option<ChartAttrs> {
    let mut attrs = ChartAttrs {
        kind: None,
        src: None,
        id: None,
    };

    for attr in tag.html_attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };

        match attr.key.as_ref() {
            k if k.eq_ignore_ascii_case(VIS_KIND_ATTR.as_bytes()) => attrs.kind = Some(value),
            k if k.eq_ignore_ascii_case(VIS_SRC_ATTR.as_bytes()) => attrs.src = Some(value),
            k if k.eq_ignore_ascii_case(b"id") => attrs.id = Some(value),
            _ => {}
        }
    }

    if attrs.kind.is_none() && attrs.src.is_none() {
        None
    } else {
        Some(attrs)
    }
}

fn unique_id(id: Option<String>, index: usize, used: &mut HashSet<String>) -> String {
    let base = id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("chart-{}", index));

    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    candidate
}
