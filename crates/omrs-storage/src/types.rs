//! Request types shared by the engine and its stores.

use std::fmt;

use omrs_search::OrderFilter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 1000;

/// Skip/limit pagination.
///
/// For the expansion read the page counts distinct orders, not rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    /// Creates a page, rejecting limits outside `1..=max_limit`.
    pub fn new(skip: u32, limit: u32, max_limit: u32) -> Result<Self, StorageError> {
        if limit == 0 || limit > max_limit {
            return Err(StorageError::invalid_request(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(Self { skip, limit })
    }

    /// Creates a page, clamping the limit into `1..=max_limit`.
    #[must_use]
    pub fn clamped(skip: u32, limit: u32, max_limit: u32) -> Self {
        Self {
            skip,
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    /// A page holding exactly one order.
    #[must_use]
    pub fn single() -> Self {
        Self { skip: 0, limit: 1 }
    }
}

/// Identifies the order for the single-order entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSelector {
    Id(i32),
    Uuid(Uuid),
}

impl OrderSelector {
    /// Builds a selector from optional request parts.
    ///
    /// Exactly one of `order_id` and `order_uuid` must be given, and the uuid
    /// must be well formed. Both checks happen before any query is issued.
    pub fn from_parts(order_id: Option<i32>, order_uuid: Option<&str>) -> Result<Self, StorageError> {
        match (order_id, order_uuid) {
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(raw)) => omrs_core::validate_uuid(raw)
                .map(Self::Uuid)
                .map_err(|e| StorageError::invalid_request(e.to_string())),
            (Some(_), Some(_)) => Err(StorageError::invalid_request(
                "provide either order_id or order_uuid, not both",
            )),
            (None, None) => Err(StorageError::invalid_request(
                "either order_id or order_uuid must be provided",
            )),
        }
    }

    /// The filter that selects this order.
    pub fn to_filter(&self) -> OrderFilter {
        match *self {
            Self::Id(id) => OrderFilter::new().order_id(id),
            Self::Uuid(uuid) => OrderFilter::new().order_uuid(uuid),
        }
    }
}

impl fmt::Display for OrderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "order_id={id}"),
            Self::Uuid(uuid) => write!(f, "order_uuid={uuid}"),
        }
    }
}

/// Knobs of the enrichment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentOptions {
    /// Locale of every concept-name lookup.
    pub locale: String,
    /// Orders of this type are additionally read through the drug template.
    pub drug_order_type_id: Option<i32>,
    /// Route empty expansion results through the fallback expander.
    pub fallback_enabled: bool,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            drug_order_type_id: Some(2),
            fallback_enabled: true,
        }
    }
}

impl EnrichmentOptions {
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_drug_order_type_id(mut self, order_type_id: Option<i32>) -> Self {
        self.drug_order_type_id = order_type_id;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// The engine-side knobs. The locale stays with the store.
    pub fn policy(&self) -> ExpansionPolicy {
        ExpansionPolicy {
            drug_order_type_id: self.drug_order_type_id,
            fallback_enabled: self.fallback_enabled,
        }
    }
}

/// What [`OrderEnrichment`](crate::OrderEnrichment) decides on its own.
///
/// Concept-name locale is not part of it: the store binds the locale into
/// every read it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    pub drug_order_type_id: Option<i32>,
    pub fallback_enabled: bool,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        EnrichmentOptions::default().policy()
    }
}

impl ExpansionPolicy {
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn is_drug_order_type(&self, order_type_id: Option<i32>) -> bool {
        matches!(
            (self.drug_order_type_id, order_type_id),
            (Some(drug), Some(actual)) if drug == actual
        )
    }
}
