//! Column classification for result sets.
//!
//! Each column is numeric, datetime or categorical. Numeric wins over datetime,
//! so a column of `20240101`-style integers stays numeric.

use crate::result_set::{Cell, ResultSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Datetime,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// One entry per result column, in result-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub columns: Vec<ColumnInfo>,
}

impl ColumnProfile {
    fn names_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn numeric(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Numeric)
    }

    pub fn datetime(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Datetime)
    }

    pub fn categorical(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Categorical)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Profile plus the rows with coerced values substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedColumns {
    pub profile: ColumnProfile,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnClassifier;

impl ColumnClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify every column of `result`. Callers short-circuit on empty result
    /// sets before getting here; an empty set yields an empty profile.
    pub fn classify(&self, result: &ResultSet) -> ClassifiedColumns {
        let mut rows = result.rows.clone();
        let mut profile = ColumnProfile::default();

        if result.is_empty() {
            return ClassifiedColumns { profile, rows };
        }

        for (index, name) in result.columns.iter().enumerate() {
            let values = result.column_values(index);
            let (kind, replacement) = classify_values(&values);

            if let Some(coerced) = replacement {
                for (row, value) in rows.iter_mut().zip(coerced) {
                    if let Some(slot) = row.get_mut(index) {
                        *slot = value;
                    }
                }
            }

            debug!("Column '{}' classified as {:?}", name, kind);
            profile.columns.push(ColumnInfo {
                name: name.clone(),
                kind,
            });
        }

        ClassifiedColumns { profile, rows }
    }
}

/// Decide one column's kind; the second element carries coerced values when a
/// coercion step decided it. NULLs are not observations: they never count
/// against numeric or datetime and stay `Null` in coerced rows.
fn classify_values(values: &[Cell]) -> (ColumnKind, Option<Vec<Cell>>) {
    let mut observed = values.iter().filter(|v| !v.is_null()).peekable();
    if observed.peek().is_none() {
        return (ColumnKind::Categorical, None);
    }

    if observed.clone().all(Cell::is_number) {
        return (ColumnKind::Numeric, None);
    }

    if observed.all(Cell::is_datetime) {
        return (ColumnKind::Datetime, None);
    }

    let numeric: Option<Vec<Cell>> = values
        .iter()
        .map(|v| if v.is_null() { Some(Cell::Null) } else { coerce_numeric(v) })
        .collect();
    if let Some(coerced) = numeric {
        return (ColumnKind::Numeric, Some(coerced));
    }

    let parsed: Vec<Option<NaiveDateTime>> = values.iter().map(coerce_datetime).collect();
    let hits = parsed.iter().filter(|p| p.is_some()).count();
    if hits * 2 > values.len() {
        let coerced = parsed
            .into_iter()
            .map(|p| p.map(Cell::DateTime).unwrap_or(Cell::Null))
            .collect();
        return (ColumnKind::Datetime, Some(coerced));
    }

    (ColumnKind::Categorical, None)
}

/// Numeric coercion of one cell; `None` means the value has no numeric reading.
pub fn coerce_numeric(cell: &Cell) -> Option<Cell> {
    match cell {
        Cell::Int(_) | Cell::Float(_) => Some(cell.clone()),
        Cell::Bool(b) => Some(Cell::Int(i64::from(*b))),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(i) = s.parse::<i64>() {
                return Some(Cell::Int(i));
            }
            s.parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Cell::Float)
        }
        Cell::Null | Cell::DateTime(_) => None,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Date/time coercion of one cell.
pub fn coerce_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Text(s) => parse_datetime(s.trim()),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // Year-month only, e.g. "2024-03"
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Convenience wrapper around `ColumnClassifier::classify`.
pub fn classify(result: &ResultSet) -> ClassifiedColumns {
    ColumnClassifier::new().classify(result)
}
