//! Denormalized order views produced by the enrichment engine.
//!
//! These are transient: every value is built fresh from the store for one
//! request and dropped with the response. Nested objects are `None` whenever
//! the row they come from is missing, voided or retired.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A clinical order with its orderer, patient and concept resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: i32,
    pub order_type_id: Option<i32>,
    pub concept_id: Option<i32>,
    pub orderer: Option<i32>,
    pub encounter_id: Option<i32>,
    pub instructions: Option<String>,
    pub date_activated: Option<NaiveDateTime>,
    pub auto_expire_date: Option<NaiveDateTime>,
    pub date_stopped: Option<NaiveDateTime>,
    pub order_reason: Option<i32>,
    pub order_reason_non_coded: Option<String>,
    pub creator: Option<i32>,
    pub date_created: Option<NaiveDateTime>,
    pub voided: bool,
    pub voided_by: Option<i32>,
    pub date_voided: Option<NaiveDateTime>,
    pub void_reason: Option<String>,
    pub patient_id: Option<i32>,
    pub accession_number: Option<String>,
    pub uuid: String,
    pub urgency: Option<String>,
    pub order_number: Option<String>,
    pub previous_order_id: Option<i32>,
    pub order_action: Option<String>,
    pub comment_to_fulfiller: Option<String>,
    pub care_setting: Option<i32>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub order_group_id: Option<i32>,
    pub sort_weight: Option<f64>,
    pub fulfiller_comment: Option<String>,
    pub fulfiller_status: Option<String>,
    pub form_namespace_and_path: Option<String>,

    pub orderer_info: Option<OrdererSummary>,
    pub patient_info: Option<PersonSummary>,
    pub concept_info: Option<ConceptSummary>,

    /// Only present for orders read through the drug template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_order_info: Option<DrugOrderDetail>,
}

/// A person reduced to identity and demographics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub person_id: i32,
    pub uuid: Option<String>,
    /// Assembled display name; `None` when the person has no usable name.
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

/// The staff member behind an order, resolved provider first, then person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdererSummary {
    #[serde(flatten)]
    pub person: PersonSummary,
    pub provider_id: Option<i32>,
    pub provider_name: Option<String>,
    pub provider_identifier: Option<String>,
    pub provider_uuid: Option<String>,
}

/// Locale metadata of the concept name that was used as display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNameLocale {
    pub concept_name_id: Option<i32>,
    pub locale: Option<String>,
    pub locale_preferred: Option<bool>,
    pub concept_name_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDatatypeSummary {
    pub concept_datatype_id: i32,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub hl7_abbreviation: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptClassSummary {
    pub concept_class_id: i32,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A coded answer of a question concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAnswerSummary {
    pub concept_id: i32,
    pub uuid: Option<String>,
    pub name: Option<String>,
}

/// A concept with its locale-resolved names.
///
/// `datatype`, `concept_class` and `answers` are only filled by the
/// expansion read and are omitted from JSON otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub concept_id: i32,
    pub uuid: Option<String>,
    /// Fully specified name in the configured locale.
    pub name: Option<String>,
    /// SHORT name in the configured locale, else the concept's own column.
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub is_set: bool,
    pub locale: Option<ConceptNameLocale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<ConceptDatatypeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_class: Option<ConceptClassSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<ConceptAnswerSummary>>,
}

/// The panel that contains a non-panel concept as a member.
pub type ParentConceptMetadata = ConceptSummary;

/// A sibling order, in the same encounter, for a member of the ordered panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetMemberOrder {
    pub order_id: i32,
    pub uuid: Option<String>,
    pub order_number: Option<String>,
    pub instructions: Option<String>,
    pub date_activated: Option<NaiveDateTime>,
    pub auto_expire_date: Option<NaiveDateTime>,
    pub date_stopped: Option<NaiveDateTime>,
    pub voided: Option<bool>,
    pub urgency: Option<String>,
    pub order_action: Option<String>,
    pub accession_number: Option<String>,
    pub concept_info: Option<ConceptSummary>,
}

/// Prescription details of a drug order.
///
/// Each coded field is paired with the display name of the concept it points
/// to, resolved in the configured locale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugOrderDetail {
    pub drug_id: Option<i32>,
    pub drug_name: Option<String>,
    pub drug_strength: Option<String>,
    pub drug_uuid: Option<String>,
    pub dose: Option<f64>,
    pub dose_units: Option<i32>,
    pub dose_units_name: Option<String>,
    pub frequency: Option<i32>,
    pub frequency_name: Option<String>,
    pub duration: Option<i32>,
    pub duration_units: Option<i32>,
    pub duration_units_name: Option<String>,
    pub route: Option<i32>,
    pub route_name: Option<String>,
    pub quantity: Option<f64>,
    pub quantity_units: Option<i32>,
    pub quantity_units_name: Option<String>,
    pub as_needed: Option<bool>,
    pub as_needed_condition: Option<String>,
    pub dosing_type: Option<String>,
    pub dosing_instructions: Option<String>,
    pub num_refills: Option<i32>,
    pub brand_name: Option<String>,
    pub dispense_as_written: Option<bool>,
    pub drug_non_coded: Option<String>,
}

/// A single order together with its panel or parent expansion.
///
/// At most one of `set_members` and `parent_concept` is populated, chosen by
/// the ordered concept's `is_set` flag. Both serialize as explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandedOrder {
    pub order: OrderRecord,
    pub set_members: Option<Vec<SetMemberOrder>>,
    pub parent_concept: Option<ParentConceptMetadata>,
}
