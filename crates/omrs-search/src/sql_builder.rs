//! Parameterized SQL assembly for the enrichment templates.
//!
//! Predicates are written with named placeholders (`:patient_id`). A template
//! is compiled once per execution: its `{where_clause}` slot is filled and
//! every named placeholder is rewritten into a positional `$n` bind, in order
//! of first appearance. Values never enter the SQL text.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// The slot every template leaves for the generated predicate.
pub const WHERE_CLAUSE_SLOT: &str = "{where_clause}";

/// The always-true predicate used when no filter key is present.
pub const MATCH_ALL: &str = "1=1";

/// Errors that can occur while building SQL.
#[derive(Debug, Error, PartialEq)]
pub enum SqlBuilderError {
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("No value bound for parameter ':{0}'")]
    UnboundParameter(String),

    #[error("Invalid parameter name: {0}")]
    InvalidParameterName(String),
}

impl SqlBuilderError {
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A typed value destined for a bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Get the value as a string for display/debugging.
    pub fn as_display_str(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

/// A named bind parameter.
pub type NamedParam = (String, SqlValue);

/// A conjunction of predicates with named placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    predicates: Vec<String>,
    params: Vec<NamedParam>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one predicate together with the named value it references.
    pub fn push(&mut self, predicate: impl Into<String>, name: impl Into<String>, value: SqlValue) {
        self.predicates.push(predicate.into());
        self.params.push((name.into(), value));
    }

    /// The predicate SQL; [`MATCH_ALL`] when empty.
    pub fn sql(&self) -> String {
        if self.predicates.is_empty() {
            MATCH_ALL.to_string()
        } else {
            self.predicates.join(" AND ")
        }
    }

    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    pub fn params(&self) -> &[NamedParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// A compiled SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Fills `template`'s where slot and rewrites named placeholders to `$n`.
///
/// Values are looked up in the where clause first, then in `extra`. A name
/// used several times binds once and reuses its position. Names present but
/// unused are not bound. `::` casts and quoted literals are left untouched.
pub fn compile_named(
    template: &str,
    where_clause: &WhereClause,
    extra: &[NamedParam],
) -> Result<BuiltQuery, SqlBuilderError> {
    for (name, _) in extra.iter().chain(where_clause.params.iter()) {
        validate_param_name(name)?;
    }

    let source = template.replace(WHERE_CLAUSE_SLOT, &where_clause.sql());

    let lookup: HashMap<&str, &SqlValue> = extra
        .iter()
        .chain(where_clause.params.iter())
        .map(|(name, value)| (name.as_str(), value))
        .collect();

    let mut sql = String::with_capacity(source.len());
    let mut params: Vec<SqlValue> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut in_literal = false;

    while i < chars.len() {
        let c = chars[i];

        if in_literal {
            sql.push(c);
            if c == '\'' {
                in_literal = false;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                sql.push(c);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                sql.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();

                let position = match positions.get(&name) {
                    Some(pos) => *pos,
                    None => {
                        let value = lookup
                            .get(name.as_str())
                            .ok_or_else(|| SqlBuilderError::UnboundParameter(name.clone()))?;
                        params.push((*value).clone());
                        positions.insert(name, params.len());
                        params.len()
                    }
                };

                sql.push('$');
                sql.push_str(&position.to_string());
                i = end;
            }
            _ => {
                sql.push(c);
                i += 1;
            }
        }
    }

    Ok(BuiltQuery { sql, params })
}

/// Validates a parameter name: ASCII letters, digits and underscores, not
/// starting with a digit.
pub fn validate_param_name(name: &str) -> Result<(), SqlBuilderError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(SqlBuilderError::InvalidParameterName(name.to_string()))
    }
}
