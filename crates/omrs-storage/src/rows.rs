//! Row-schema contract shared by the SQL templates and the row folder.
//!
//! Every template projects its joined tables under a fixed role prefix
//! (`orderer_*`, `patient_*`, `concept_*`, `set_member_*`,
//! `parent_concept_*`, ...). A store decodes each row into the typed structs
//! below, and the folder only ever looks at these structs, never at column
//! names. All joined columns are optional: a `LEFT JOIN` that found nothing
//! (or filtered out a voided/retired row) yields `None` everywhere.

use chrono::{NaiveDate, NaiveDateTime};
use omrs_core::NameParts;

/// The table role a group of columns is projected under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Orderer,
    Provider,
    Patient,
    Concept,
    Answer,
    SetMember,
    SetMemberConcept,
    ParentConcept,
}

impl ColumnRole {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Orderer => "orderer",
            Self::Provider => "provider",
            Self::Patient => "patient",
            Self::Concept => "concept",
            Self::Answer => "answer",
            Self::SetMember => "set_member",
            Self::SetMemberConcept => "set_member_concept",
            Self::ParentConcept => "parent_concept",
        }
    }

    /// Column alias for `field` under this role, e.g. `parent_concept_id`.
    pub fn column(self, field: &str) -> String {
        format!("{}_{}", self.prefix(), field)
    }

    /// Whether person names projected under this role include `degree`.
    pub const fn carries_degree(self) -> bool {
        matches!(self, Self::Orderer)
    }
}

/// Fields of a person projection, unprefixed.
pub const PERSON_FIELDS: &[&str] = &[
    "person_id",
    "uuid",
    "gender",
    "birthdate",
    "prefix",
    "given_name",
    "middle_name",
    "family_name_prefix",
    "family_name",
    "family_name2",
    "family_name_suffix",
    "degree",
];

/// Fields of a concept projection, unprefixed. The datatype and class fields
/// are only projected by the expansion template.
pub const CONCEPT_FIELDS: &[&str] = &[
    "id",
    "uuid",
    "short_name",
    "description",
    "is_set",
    "name_id",
    "name",
    "name_locale",
    "name_locale_preferred",
    "name_type",
];

pub const CONCEPT_DETAIL_FIELDS: &[&str] = &[
    "datatype_id",
    "datatype_uuid",
    "datatype_name",
    "datatype_hl7_abbreviation",
    "datatype_description",
    "class_id",
    "class_uuid",
    "class_name",
    "class_description",
];

pub const PROVIDER_FIELDS: &[&str] = &["id", "name", "identifier", "uuid"];

pub const ANSWER_FIELDS: &[&str] = &["concept_id", "uuid", "name"];

/// Order fields of a set member, unprefixed.
pub const SET_MEMBER_FIELDS: &[&str] = &[
    "order_id",
    "uuid",
    "order_number",
    "instructions",
    "date_activated",
    "auto_expire_date",
    "date_stopped",
    "voided",
    "urgency",
    "order_action",
    "accession_number",
];

/// Alias of `orders.concept_id`. The bare `concept_id` alias belongs to the
/// resolved concept, which is `NULL` when the concept is retired.
pub const ORDER_CONCEPT_ALIAS: &str = "order_concept_id";

/// Every `orders` column. Projected without a prefix, see [`order_column`].
pub const ORDER_FIELDS: &[&str] = &[
    "order_id",
    "order_type_id",
    "concept_id",
    "orderer",
    "encounter_id",
    "instructions",
    "date_activated",
    "auto_expire_date",
    "date_stopped",
    "order_reason",
    "order_reason_non_coded",
    "creator",
    "date_created",
    "voided",
    "voided_by",
    "date_voided",
    "void_reason",
    "patient_id",
    "accession_number",
    "uuid",
    "urgency",
    "order_number",
    "previous_order_id",
    "order_action",
    "comment_to_fulfiller",
    "care_setting",
    "scheduled_date",
    "order_group_id",
    "sort_weight",
    "fulfiller_comment",
    "fulfiller_status",
    "form_namespace_and_path",
];

/// Drug template columns. These are template specific and carry their own
/// names rather than a role prefix.
pub const DRUG_FIELDS: &[&str] = &[
    "drug_order_id",
    "drug_id",
    "drug_name",
    "drug_strength",
    "drug_uuid",
    "dose",
    "dose_units",
    "dose_units_name",
    "frequency",
    "frequency_name",
    "duration",
    "duration_units",
    "duration_units_name",
    "route",
    "route_name",
    "quantity",
    "quantity_units",
    "quantity_units_name",
    "as_needed",
    "as_needed_condition",
    "dosing_type",
    "dosing_instructions",
    "num_refills",
    "brand_name",
    "dispense_as_written",
    "drug_non_coded",
];

/// Column alias for an `orders` field.
pub fn order_column(field: &str) -> &str {
    if field == "concept_id" {
        ORDER_CONCEPT_ALIAS
    } else {
        field
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderColumns {
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
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonColumns {
    pub person_id: Option<i32>,
    pub uuid: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub name: NameParts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderColumns {
    pub provider_id: Option<i32>,
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatatypeColumns {
    pub datatype_id: Option<i32>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub hl7_abbreviation: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassColumns {
    pub class_id: Option<i32>,
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A concept with its locale-resolved names.
///
/// `short_name` is already the SHORT name in the configured locale, falling
/// back to the concept's own column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptColumns {
    pub concept_id: Option<i32>,
    pub uuid: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub is_set: Option<bool>,
    pub name_id: Option<i32>,
    pub name: Option<String>,
    pub name_locale: Option<String>,
    pub name_locale_preferred: Option<bool>,
    pub name_type: Option<String>,
    pub datatype: DatatypeColumns,
    pub class: ClassColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerColumns {
    pub concept_id: Option<i32>,
    pub uuid: Option<String>,
    pub name: Option<String>,
}

/// A sibling order whose concept is a member of the ordered panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetMemberColumns {
    pub order_id: Option<i32>,
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
    pub concept: ConceptColumns,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrugColumns {
    /// `drug_order.order_id`; `None` when the order has no drug_order row.
    pub drug_order_id: Option<i32>,
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

/// One row of the base template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedOrderRow {
    pub order: OrderColumns,
    pub provider: ProviderColumns,
    pub orderer: PersonColumns,
    pub patient: PersonColumns,
    pub concept: ConceptColumns,
}

/// One row of the expansion template. An order spans as many rows as its
/// answer and set-member joins multiply out to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionRow {
    pub base: EnrichedOrderRow,
    pub answer: AnswerColumns,
    pub set_member: SetMemberColumns,
    pub parent: ConceptColumns,
}

impl ExpansionRow {
    pub fn order_id(&self) -> i32 {
        self.base.order.order_id
    }
}

/// One row of the drug template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrugOrderRow {
    pub base: EnrichedOrderRow,
    pub drug: DrugColumns,
}

/// Result of the cheap existence probe run before any multi-join read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderProbe {
    pub order_id: i32,
    pub order_type_id: Option<i32>,
    pub concept_id: Option<i32>,
    pub encounter_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_columns() {
        assert_eq!(ColumnRole::ParentConcept.column("id"), "parent_concept_id");
        assert_eq!(
            ColumnRole::SetMemberConcept.column("id"),
            "set_member_concept_id"
        );
        assert_eq!(ColumnRole::Orderer.column("given_name"), "orderer_given_name");
        assert_eq!(ColumnRole::SetMember.column("order_id"), "set_member_order_id");
    }

    #[test]
    fn test_only_orderer_carries_degree() {
        assert!(ColumnRole::Orderer.carries_degree());
        assert!(!ColumnRole::Patient.carries_degree());
    }

    #[test]
    fn test_role_prefixes_are_distinct() {
        let roles = [
            ColumnRole::Orderer,
            ColumnRole::Provider,
            ColumnRole::Patient,
            ColumnRole::Concept,
            ColumnRole::Answer,
            ColumnRole::SetMember,
            ColumnRole::SetMemberConcept,
            ColumnRole::ParentConcept,
        ];
        let mut columns: Vec<String> = roles.iter().map(|r| r.column("uuid")).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), roles.len());
        assert!(
            !columns
                .iter()
                .any(|c| ORDER_FIELDS.iter().any(|f| order_column(f) == c))
        );
    }

    #[test]
    fn test_order_concept_alias_avoids_concept_role() {
        let concept_id = ColumnRole::Concept.column("id");
        assert_eq!(concept_id, "concept_id");
        assert!(ORDER_FIELDS.iter().all(|f| order_column(f) != concept_id));
        assert_eq!(order_column("order_id"), "order_id");
    }
}
