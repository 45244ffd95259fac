//! Tabular result sets as handed over by the relational store.

use crate::error::{EngineError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One scalar value of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Only produced by coercion or by in-process callers; JSON strings always
    /// arrive as `Text`.
    #[serde(skip_deserializing)]
    DateTime(NaiveDateTime),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Native numeric representation (no coercion).
    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self, Cell::DateTime(_))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

impl From<&serde_json::Value> for Cell {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => Cell::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Ordered column names plus rectangular rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Build from a list of JSON row objects, the shape the store returns for
    /// SELECT results. Column order follows the first record; keys missing in
    /// later records become `Null`.
    pub fn from_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Cell::from).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Parse either `{"columns": [...], "rows": [[...]]}` or a list of row
    /// objects.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        if let serde_json::Value::Array(items) = value {
            let records = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    serde_json::Value::Object(map) => Ok(map),
                    other => Err(EngineError::InvalidInput(format!(
                        "row {} is not an object: {}",
                        i, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::from_records(&records));
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, `Null` where a short row has no entry.
    pub fn column_values(&self, index: usize) -> Vec<Cell> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Cell::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_deserialize_untagged() {
        let row: Vec<Cell> = serde_json::from_str(r#"[null, true, 3, 2.5, "2024-01-01"]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::Null,
                Cell::Bool(true),
                Cell::Int(3),
                Cell::Float(2.5),
                Cell::Text("2024-01-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_records_keeps_first_record_order() {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(
            r#"[{"college": "计算机学院", "人数": 12}, {"college": "文学院"}]"#,
        )
        .unwrap();
        let set = ResultSet::from_records(&records);
        assert_eq!(set.columns, vec!["college".to_string(), "人数".to_string()]);
        assert_eq!(set.row_count(), 2);
        let counts = set.column_values(1);
        assert_eq!(counts, vec![Cell::Int(12), Cell::Null]);
    }

    #[test]
    fn test_from_json_str_accepts_both_shapes() {
        let tabular = ResultSet::from_json_str(r#"{"columns": ["grade", "人数"], "rows": [["2023级", 10]]}"#).unwrap();
        assert_eq!(tabular.columns, vec!["grade".to_string(), "人数".to_string()]);
        assert_eq!(tabular.rows, vec![vec![Cell::Text("2023级".to_string()), Cell::Int(10)]]);

        let records = ResultSet::from_json_str(r#"[{"grade": "2024级", "人数": 8}]"#).unwrap();
        assert_eq!(records, ResultSet::new(tabular.columns.clone(), vec![vec!["2024级".into(), Cell::Int(8)]]));
    }

    #[test]
    fn test_from_json_str_errors() {
        assert!(matches!(ResultSet::from_json_str("not json"), Err(EngineError::Json(_))));
        assert!(matches!(
            ResultSet::from_json_str(r#"[{"a": 1}, 2]"#),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            ResultSet::load(Path::new("/nonexistent/result.json")),
            Err(EngineError::Io(_))
        ));
    }
}
