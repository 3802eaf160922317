//! Order filter keys and their translation into WHERE predicates.
//!
//! The set of recognized keys is closed. Every key maps to exactly one column
//! of the enrichment templates (`o` = orders, `v` = visit, `c` = concept) and
//! one comparison. Keys outside the set are ignored, not rejected.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::sql_builder::{SqlBuilderError, SqlValue, WhereClause};

/// The value type a filter key binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
    Uuid,
    Boolean,
    Timestamp,
}

/// A recognized order filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    OrderTypeId,
    VisitUuid,
    Voided,
    EncounterId,
    PatientId,
    ConceptId,
    Orderer,
    DateActivatedFrom,
    DateActivatedTo,
    Urgency,
    OrderAction,
    ConceptUuid,
    OrderId,
    OrderUuid,
}

impl FilterKey {
    pub const ALL: [FilterKey; 14] = [
        Self::OrderTypeId,
        Self::VisitUuid,
        Self::Voided,
        Self::EncounterId,
        Self::PatientId,
        Self::ConceptId,
        Self::Orderer,
        Self::DateActivatedFrom,
        Self::DateActivatedTo,
        Self::Urgency,
        Self::OrderAction,
        Self::ConceptUuid,
        Self::OrderId,
        Self::OrderUuid,
    ];

    /// The external key, also used as the bind parameter name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderTypeId => "order_type_id",
            Self::VisitUuid => "visit_uuid",
            Self::Voided => "voided",
            Self::EncounterId => "encounter_id",
            Self::PatientId => "patient_id",
            Self::ConceptId => "concept_id",
            Self::Orderer => "orderer",
            Self::DateActivatedFrom => "date_activated_from",
            Self::DateActivatedTo => "date_activated_to",
            Self::Urgency => "urgency",
            Self::OrderAction => "order_action",
            Self::ConceptUuid => "concept_uuid",
            Self::OrderId => "order_id",
            Self::OrderUuid => "order_uuid",
        }
    }

    /// Parses an external key. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// The qualified column the key constrains.
    pub fn column(self) -> &'static str {
        match self {
            Self::OrderTypeId => "o.order_type_id",
            Self::VisitUuid => "v.uuid",
            Self::Voided => "o.voided",
            Self::EncounterId => "o.encounter_id",
            Self::PatientId => "o.patient_id",
            Self::ConceptId => "o.concept_id",
            Self::Orderer => "o.orderer",
            Self::DateActivatedFrom | Self::DateActivatedTo => "o.date_activated",
            Self::Urgency => "o.urgency",
            Self::OrderAction => "o.order_action",
            Self::ConceptUuid => "c.uuid",
            Self::OrderId => "o.order_id",
            Self::OrderUuid => "o.uuid",
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            Self::DateActivatedFrom => ">=",
            Self::DateActivatedTo => "<=",
            _ => "=",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::OrderTypeId
            | Self::EncounterId
            | Self::PatientId
            | Self::ConceptId
            | Self::Orderer
            | Self::OrderId => ValueKind::Integer,
            Self::VisitUuid | Self::ConceptUuid | Self::OrderUuid => ValueKind::Uuid,
            Self::Voided => ValueKind::Boolean,
            Self::DateActivatedFrom | Self::DateActivatedTo => ValueKind::Timestamp,
            Self::Urgency | Self::OrderAction => ValueKind::Text,
        }
    }

    /// The predicate fragment, e.g. `o.patient_id = :patient_id`.
    pub fn predicate(self) -> String {
        format!("{} {} :{}", self.column(), self.operator(), self.as_str())
    }

    /// Checks and normalizes a typed value for this key.
    pub fn coerce(self, value: SqlValue) -> Result<SqlValue, SqlBuilderError> {
        match (self.kind(), value) {
            (ValueKind::Integer, SqlValue::Integer(i)) => Ok(SqlValue::Integer(i)),
            (ValueKind::Integer, SqlValue::Text(s)) => self.coerce_text(&s),
            (ValueKind::Boolean, SqlValue::Boolean(b)) => Ok(SqlValue::Boolean(b)),
            (ValueKind::Boolean, SqlValue::Integer(0)) => Ok(SqlValue::Boolean(false)),
            (ValueKind::Boolean, SqlValue::Integer(1)) => Ok(SqlValue::Boolean(true)),
            (ValueKind::Boolean, SqlValue::Text(s)) => self.coerce_text(&s),
            (ValueKind::Timestamp, SqlValue::Timestamp(ts)) => Ok(SqlValue::Timestamp(ts)),
            (ValueKind::Timestamp, SqlValue::Text(s)) => self.coerce_text(&s),
            (ValueKind::Text | ValueKind::Uuid, SqlValue::Text(s)) => self.coerce_text(&s),
            (kind, other) => Err(SqlBuilderError::invalid_value(
                self.as_str(),
                format!("expected {kind:?}, got {}", other.as_display_str()),
            )),
        }
    }

    /// Parses a textual value (query string, CLI argument) for this key.
    pub fn coerce_text(self, raw: &str) -> Result<SqlValue, SqlBuilderError> {
        let raw = raw.trim();
        match self.kind() {
            ValueKind::Integer => raw
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|e| SqlBuilderError::invalid_value(self.as_str(), e.to_string())),
            ValueKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(SqlValue::Boolean(true)),
                "false" | "0" => Ok(SqlValue::Boolean(false)),
                _ => Err(SqlBuilderError::invalid_value(
                    self.as_str(),
                    format!("'{raw}' is not a boolean"),
                )),
            },
            // Stored uuids are lower-case hyphenated.
            ValueKind::Uuid => omrs_core::validate_uuid(raw)
                .map(|uuid| SqlValue::Text(uuid.to_string()))
                .map_err(|e| SqlBuilderError::invalid_value(self.as_str(), e.to_string())),
            ValueKind::Timestamp => parse_timestamp(raw, self == Self::DateActivatedTo)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| {
                    SqlBuilderError::invalid_value(
                        self.as_str(),
                        format!("'{raw}' is not a date or datetime"),
                    )
                }),
            ValueKind::Text => Ok(SqlValue::Text(raw.to_string())),
        }
    }

    /// Converts a JSON value for this key. `null` means "no constraint".
    pub fn coerce_json(self, value: &Value) -> Result<Option<SqlValue>, SqlBuilderError> {
        let typed = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => SqlValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => {
                    return Err(SqlBuilderError::invalid_value(
                        self.as_str(),
                        format!("{n} is not an integer"),
                    ));
                }
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                return Err(SqlBuilderError::invalid_value(
                    self.as_str(),
                    "expected a scalar value",
                ));
            }
        };
        self.coerce(typed).map(Some)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`.
///
/// A bare date expands to the start of the day, or to its last second when it
/// is an upper bound.
fn parse_timestamp(raw: &str, upper_bound: bool) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if upper_bound {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time))
}

/// A set of order filter constraints, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    conditions: IndexMap<FilterKey, SqlValue>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from a JSON object.
    ///
    /// Unknown keys are skipped; null values add no constraint.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, SqlBuilderError> {
        let mut filter = Self::new();
        for (key, value) in map {
            let Some(filter_key) = FilterKey::parse(key) else {
                tracing::debug!(key = %key, "Ignoring unrecognized order filter key");
                continue;
            };
            if let Some(value) = filter_key.coerce_json(value)? {
                filter.conditions.insert(filter_key, value);
            }
        }
        Ok(filter)
    }

    /// Builds a filter from textual `key`/`value` pairs; unknown keys are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, SqlBuilderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let Some(filter_key) = FilterKey::parse(key) else {
                tracing::debug!(key = %key, "Ignoring unrecognized order filter key");
                continue;
            };
            let value = filter_key.coerce_text(value.as_ref())?;
            filter.conditions.insert(filter_key, value);
        }
        Ok(filter)
    }

    /// Sets a constraint, replacing any previous value for the key.
    pub fn with(mut self, key: FilterKey, value: impl Into<SqlValue>) -> Result<Self, SqlBuilderError> {
        let value = key.coerce(value.into())?;
        self.conditions.insert(key, value);
        Ok(self)
    }

    fn set(mut self, key: FilterKey, value: SqlValue) -> Self {
        self.conditions.insert(key, value);
        self
    }

    #[must_use]
    pub fn order_id(self, id: i32) -> Self {
        self.set(FilterKey::OrderId, id.into())
    }

    #[must_use]
    pub fn order_uuid(self, uuid: uuid::Uuid) -> Self {
        self.set(FilterKey::OrderUuid, SqlValue::Text(uuid.to_string()))
    }

    #[must_use]
    pub fn order_type_id(self, id: i32) -> Self {
        self.set(FilterKey::OrderTypeId, id.into())
    }

    #[must_use]
    pub fn patient_id(self, id: i32) -> Self {
        self.set(FilterKey::PatientId, id.into())
    }

    #[must_use]
    pub fn encounter_id(self, id: i32) -> Self {
        self.set(FilterKey::EncounterId, id.into())
    }

    #[must_use]
    pub fn concept_id(self, id: i32) -> Self {
        self.set(FilterKey::ConceptId, id.into())
    }

    #[must_use]
    pub fn orderer(self, provider_id: i32) -> Self {
        self.set(FilterKey::Orderer, provider_id.into())
    }

    #[must_use]
    pub fn voided(self, voided: bool) -> Self {
        self.set(FilterKey::Voided, voided.into())
    }

    #[must_use]
    pub fn urgency(self, urgency: impl Into<String>) -> Self {
        self.set(FilterKey::Urgency, SqlValue::Text(urgency.into()))
    }

    #[must_use]
    pub fn order_action(self, action: impl Into<String>) -> Self {
        self.set(FilterKey::OrderAction, SqlValue::Text(action.into()))
    }

    #[must_use]
    pub fn visit_uuid(self, uuid: uuid::Uuid) -> Self {
        self.set(FilterKey::VisitUuid, SqlValue::Text(uuid.to_string()))
    }

    #[must_use]
    pub fn concept_uuid(self, uuid: uuid::Uuid) -> Self {
        self.set(FilterKey::ConceptUuid, SqlValue::Text(uuid.to_string()))
    }

    #[must_use]
    pub fn date_activated_from(self, from: NaiveDateTime) -> Self {
        self.set(FilterKey::DateActivatedFrom, from.into())
    }

    #[must_use]
    pub fn date_activated_to(self, to: NaiveDateTime) -> Self {
        self.set(FilterKey::DateActivatedTo, to.into())
    }

    pub fn get(&self, key: FilterKey) -> Option<&SqlValue> {
        self.conditions.get(&key)
    }

    pub fn contains(&self, key: FilterKey) -> bool {
        self.conditions.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &SqlValue)> {
        self.conditions.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Translates a filter into a conjunction of named-parameter predicates.
///
/// One predicate per present key; an empty filter yields the always-true
/// predicate.
pub fn build_where_clause(filter: &OrderFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    for (key, value) in filter.iter() {
        clause.push(key.predicate(), key.as_str(), value.clone());
    }
    clause
}
