//! Structural SQL checks.
//!
//! Shape only: leading keyword, and for INSERT a complete VALUES clause. No
//! grammar or schema validation happens here.

use serde::{Deserialize, Serialize};

pub const STATEMENT_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE", "WITH"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn ok() -> Self {
        Self { ok: true, reason: None }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Statement category by leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    pub fn of(sql: &str) -> Self {
        let upper = sql.trim().to_uppercase();
        if upper.starts_with("SELECT") || upper.starts_with("WITH") {
            StatementKind::Select
        } else if upper.starts_with("INSERT") {
            StatementKind::Insert
        } else if upper.starts_with("UPDATE") {
            StatementKind::Update
        } else if upper.starts_with("DELETE") {
            StatementKind::Delete
        } else {
            StatementKind::Other
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update | StatementKind::Delete)
    }
}

pub fn starts_with_statement_keyword(sql: &str) -> bool {
    let upper = sql.trim().to_uppercase();
    STATEMENT_KEYWORDS.iter().any(|kw| upper.starts_with(kw))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlValidator;

impl SqlValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sql: &str) -> ValidationVerdict {
        let upper = sql.trim().to_uppercase();

        if upper.is_empty() {
            return ValidationVerdict::fail("empty statement");
        }

        if !starts_with_statement_keyword(&upper) {
            return ValidationVerdict::fail(format!(
                "statement must start with one of {}",
                STATEMENT_KEYWORDS.join("/")
            ));
        }

        if upper.starts_with("INSERT") {
            return check_insert(sql);
        }

        ValidationVerdict::ok()
    }

    pub fn is_valid(&self, sql: &str) -> bool {
        self.validate(sql).ok
    }
}

/// Completeness check for INSERT statements.
pub fn check_insert(sql: &str) -> ValidationVerdict {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("INSERT") {
        return ValidationVerdict::fail("not an INSERT statement");
    }

    if !upper.contains("INTO") || !upper.contains("VALUES") {
        return ValidationVerdict::fail("INSERT requires INTO and VALUES");
    }

    // ASCII upper-casing keeps byte offsets aligned with the original text
    let values_at = match trimmed.to_ascii_uppercase().find("VALUES") {
        Some(i) => i,
        None => return ValidationVerdict::fail("INSERT requires INTO and VALUES"),
    };
    let tail = trimmed[values_at + "VALUES".len()..].trim();

    if tail.is_empty() {
        return ValidationVerdict::fail("VALUES clause is empty");
    }

    if !tail.starts_with('(') {
        return ValidationVerdict::fail("VALUES clause must start with '('");
    }

    let open = tail.matches('(').count();
    let close = tail.matches(')').count();
    if close < open {
        return ValidationVerdict::fail(format!(
            "unbalanced parentheses in VALUES clause ({} open, {} close)",
            open, close
        ));
    }

    // single record: something must sit between the parentheses
    if !tail.contains(',') {
        if let (Some(start), Some(end)) = (tail.find('('), tail.find(')')) {
            if start < end && tail[start + 1..end].trim().is_empty() {
                return ValidationVerdict::fail("VALUES record is empty");
            }
        }
    }

    ValidationVerdict::ok()
}

pub fn is_insert_complete(sql: &str) -> bool {
    check_insert(sql).ok
}

/// Convenience wrapper around `SqlValidator::validate`.
pub fn validate(sql: &str) -> ValidationVerdict {
    SqlValidator::new().validate(sql)
}
