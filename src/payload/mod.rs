//! Chart Payloads
//!
//! A data source answers with a text body shaped like
//! `{ "data": <rows>, "options": <render options> }`. Parsing turns every
//! timestamp-shaped string in the tree into an instant.

mod timestamp;
mod value;

pub use timestamp::{looks_like_timestamp, parse_timestamp};
pub use value::Value;

use thiserror::Error;

/// Parsed response of one data source
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Tabular rows handed to the chart (`data` member)
    pub rows: Value,
    /// Chart configuration (`options` member)
    pub render_options: Value,
}

impl Payload {
    /// Parse a response body
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let json: serde_json::Value = serde_json::from_str(text)?;

        let mut map = match Value::from_json(json) {
            Value::Object(map) => map,
            _ => return Err(ParseError::NotAnObject),
        };

        let rows = map
            .shift_remove("data")
            .ok_or(ParseError::MissingField("data"))?;
        let render_options = map
            .shift_remove("options")
            .filter(|v| !v.is_null())
            .unwrap_or_else(Value::empty_object);

        Ok(Self {
            rows,
            render_options,
        })
    }
}

/// Errors raised while turning a response body into a [`Payload`]
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Payload is missing the `{0}` member")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_payload() {
        let payload = Payload::parse(
            r#"{"data": [["Month", "In"], ["2014-05-01T00:00:00Z", 12.5]], "options": {"title": "In/Out"}}"#,
        )
        .unwrap();

        let rows = payload.rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].as_array().unwrap()[0].as_datetime(),
            Some(&Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            payload.render_options.get("title").and_then(Value::as_str),
            Some("In/Out")
        );
    }

    #[test]
    fn test_options_default_to_empty_object() {
        let payload = Payload::parse(r#"{"data": []}"#).unwrap();
        assert_eq!(payload.render_options, Value::empty_object());

        let payload = Payload::parse(r#"{"data": [], "options": null}"#).unwrap();
        assert_eq!(payload.render_options, Value::empty_object());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Payload::parse("not json"), Err(ParseError::Json(_))));
        assert!(matches!(Payload::parse("[1, 2]"), Err(ParseError::NotAnObject)));
        assert!(matches!(
            Payload::parse(r#"{"options": {}}"#),
            Err(ParseError::MissingField("data"))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = ParseError::MissingField("data");
        assert_eq!(err.to_string(), "Payload is missing the `data` member");
    }
}
