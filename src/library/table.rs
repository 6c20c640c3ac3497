//! Rows to data table
//!
//! Chart rows arrive as an array of arrays. The first row holds column
//! labels; every following row holds one domain value and one number per
//! series.

use crate::payload::Value;

use super::RenderError;

/// Tabular chart data
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    /// Column labels; column 0 is the domain
    pub columns: Vec<String>,
    /// One entry per data row
    pub rows: Vec<DataRow>,
}

/// One row of a [`DataTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    /// Domain label (category name, formatted date, ...)
    pub label: String,
    /// Series values; `None` leaves a gap
    pub values: Vec<Option<f64>>,
}

impl DataTable {
    /// Build a table from payload rows
    pub fn from_rows(rows: &Value) -> Result<Self, RenderError> {
        let rows = rows
            .as_array()
            .ok_or_else(|| RenderError::InvalidData("rows must be an array".to_string()))?;

        let (header, body) = rows
            .split_first()
            .ok_or_else(|| RenderError::InvalidData("rows need a header row".to_string()))?;

        let columns: Vec<String> = header
            .as_array()
            .ok_or_else(|| RenderError::InvalidData("header row must be an array".to_string()))?
            .iter()
            .map(|v| v.to_string())
            .collect();

        if columns.len() < 2 {
            return Err(RenderError::InvalidData(
                "need a domain column and at least one series".to_string(),
            ));
        }

        let mut table_rows = Vec::with_capacity(body.len());
        for (i, row) in body.iter().enumerate() {
            let cells = row.as_array().ok_or_else(|| {
                RenderError::InvalidData(format!("row {} must be an array", i + 1))
            })?;

            if cells.len() != columns.len() {
                return Err(RenderError::InvalidData(format!(
                    "row {} has {} cells, expected {}",
                    i + 1,
                    cells.len(),
                    columns.len()
                )));
            }

            let values = cells[1..]
                .iter()
                .enumerate()
                .map(|(col, cell)| match cell {
                    Value::Null => Ok(None),
                    Value::Number(n) => Ok(n.as_f64()),
                    other => Err(RenderError::InvalidData(format!(
                        "row {} column {} is not a number: {}",
                        i + 1,
                        col + 1,
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;

            table_rows.push(DataRow {
                label: cells[0].to_string(),
                values,
            });
        }

        Ok(Self {
            columns,
            rows: table_rows,
        })
    }

    /// Names of the value series (all columns but the domain)
    pub fn series_names(&self) -> &[String] {
        &self.columns[1..]
    }

    /// Smallest and largest value over every series, `None` when the table has no values
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .flat_map(|r| r.values.iter().flatten().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    #[test]
    fn test_from_rows() {
        let table = DataTable::from_rows(&rows(json!([
            ["Month", "Incoming", "Outgoing"],
            ["2014-05-01T00:00:00Z", 1200.5, 830],
            ["2014-06-01T00:00:00Z", 990, null]
        ])))
        .unwrap();

        assert_eq!(table.series_names(), &["Incoming", "Outgoing"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].label, "2014-05-01");
        assert_eq!(table.rows[1].values, vec![Some(990.0), None]);
        assert_eq!(table.value_range(), Some((830.0, 1200.5)));
    }

    #[test]
    fn test_header_only() {
        let table = DataTable::from_rows(&rows(json!([["Category", "Total"]]))).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.value_range(), None);
    }

    #[test]
    fn test_invalid_rows() {
        assert!(DataTable::from_rows(&rows(json!({"a": 1}))).is_err());
        assert!(DataTable::from_rows(&rows(json!([]))).is_err());
        assert!(DataTable::from_rows(&rows(json!([["Only"]]))).is_err());
        assert!(DataTable::from_rows(&rows(json!([["A", "B"], ["x"]]))).is_err());
        assert!(DataTable::from_rows(&rows(json!([["A", "B"], ["x", "lots"]]))).is_err());
    }
}
