//! Typed decoding of template rows into the row-schema contract.

use omrs_core::NameParts;
use omrs_storage::rows::order_column;
use omrs_storage::{
    AnswerColumns, ClassColumns, ColumnRole, ConceptColumns, DatatypeColumns, DrugColumns,
    DrugOrderRow, EnrichedOrderRow, ExpansionRow, OrderColumns, OrderProbe, PersonColumns,
    ProviderColumns, SetMemberColumns, StorageError,
};
use sqlx_core::decode::Decode;
use sqlx_core::row::Row;
use sqlx_core::types::Type;
use sqlx_postgres::{PgRow, Postgres};

use crate::error::storage_error;

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StorageError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(column).map_err(storage_error)
}

fn get_role<'r, T>(row: &'r PgRow, role: ColumnRole, field: &str) -> Result<T, StorageError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    get(row, &role.column(field))
}

pub fn decode_probe(row: &PgRow) -> Result<OrderProbe, StorageError> {
    Ok(OrderProbe {
        order_id: get(row, "order_id")?,
        order_type_id: get(row, "order_type_id")?,
        concept_id: get(row, "concept_id")?,
        encounter_id: get(row, "encounter_id")?,
    })
}

pub fn decode_order(row: &PgRow) -> Result<OrderColumns, StorageError> {
    Ok(OrderColumns {
        order_id: get(row, "order_id")?,
        order_type_id: get(row, "order_type_id")?,
        concept_id: get(row, order_column("concept_id"))?,
        orderer: get(row, "orderer")?,
        encounter_id: get(row, "encounter_id")?,
        instructions: get(row, "instructions")?,
        date_activated: get(row, "date_activated")?,
        auto_expire_date: get(row, "auto_expire_date")?,
        date_stopped: get(row, "date_stopped")?,
        order_reason: get(row, "order_reason")?,
        order_reason_non_coded: get(row, "order_reason_non_coded")?,
        creator: get(row, "creator")?,
        date_created: get(row, "date_created")?,
        voided: get(row, "voided")?,
        voided_by: get(row, "voided_by")?,
        date_voided: get(row, "date_voided")?,
        void_reason: get(row, "void_reason")?,
        patient_id: get(row, "patient_id")?,
        accession_number: get(row, "accession_number")?,
        uuid: get(row, "uuid")?,
        urgency: get(row, "urgency")?,
        order_number: get(row, "order_number")?,
        previous_order_id: get(row, "previous_order_id")?,
        order_action: get(row, "order_action")?,
        comment_to_fulfiller: get(row, "comment_to_fulfiller")?,
        care_setting: get(row, "care_setting")?,
        scheduled_date: get(row, "scheduled_date")?,
        order_group_id: get(row, "order_group_id")?,
        sort_weight: get(row, "sort_weight")?,
        fulfiller_comment: get(row, "fulfiller_comment")?,
        fulfiller_status: get(row, "fulfiller_status")?,
        form_namespace_and_path: get(row, "form_namespace_and_path")?,
    })
}

fn decode_person(row: &PgRow, role: ColumnRole) -> Result<PersonColumns, StorageError> {
    let degree = if role.carries_degree() {
        get_role(row, role, "degree")?
    } else {
        None
    };

    Ok(PersonColumns {
        person_id: get_role(row, role, "person_id")?,
        uuid: get_role(row, role, "uuid")?,
        gender: get_role(row, role, "gender")?,
        birthdate: get_role(row, role, "birthdate")?,
        name: NameParts {
            prefix: get_role(row, role, "prefix")?,
            given: get_role(row, role, "given_name")?,
            middle: get_role(row, role, "middle_name")?,
            family_prefix: get_role(row, role, "family_name_prefix")?,
            family: get_role(row, role, "family_name")?,
            family2: get_role(row, role, "family_name2")?,
            family_suffix: get_role(row, role, "family_name_suffix")?,
            degree,
        },
    })
}

fn decode_provider(row: &PgRow) -> Result<ProviderColumns, StorageError> {
    let role = ColumnRole::Provider;
    Ok(ProviderColumns {
        provider_id: get_role(row, role, "id")?,
        name: get_role(row, role, "name")?,
        identifier: get_role(row, role, "identifier")?,
        uuid: get_role(row, role, "uuid")?,
    })
}

/// Decodes a concept. Datatype and class are read only when the template
/// projects them.
fn decode_concept(
    row: &PgRow,
    role: ColumnRole,
    with_details: bool,
) -> Result<ConceptColumns, StorageError> {
    let (datatype, class) = if with_details {
        (
            DatatypeColumns {
                datatype_id: get_role(row, role, "datatype_id")?,
                uuid: get_role(row, role, "datatype_uuid")?,
                name: get_role(row, role, "datatype_name")?,
                hl7_abbreviation: get_role(row, role, "datatype_hl7_abbreviation")?,
                description: get_role(row, role, "datatype_description")?,
            },
            ClassColumns {
                class_id: get_role(row, role, "class_id")?,
                uuid: get_role(row, role, "class_uuid")?,
                name: get_role(row, role, "class_name")?,
                description: get_role(row, role, "class_description")?,
            },
        )
    } else {
        Default::default()
    };

    Ok(ConceptColumns {
        concept_id: get_role(row, role, "id")?,
        uuid: get_role(row, role, "uuid")?,
        short_name: get_role(row, role, "short_name")?,
        description: get_role(row, role, "description")?,
        is_set: get_role(row, role, "is_set")?,
        name_id: get_role(row, role, "name_id")?,
        name: get_role(row, role, "name")?,
        name_locale: get_role(row, role, "name_locale")?,
        name_locale_preferred: get_role(row, role, "name_locale_preferred")?,
        name_type: get_role(row, role, "name_type")?,
        datatype,
        class,
    })
}

fn decode_answer(row: &PgRow) -> Result<AnswerColumns, StorageError> {
    let role = ColumnRole::Answer;
    Ok(AnswerColumns {
        concept_id: get_role(row, role, "concept_id")?,
        uuid: get_role(row, role, "uuid")?,
        name: get_role(row, role, "name")?,
    })
}

pub fn decode_set_member(row: &PgRow) -> Result<SetMemberColumns, StorageError> {
    let role = ColumnRole::SetMember;
    Ok(SetMemberColumns {
        order_id: get_role(row, role, "order_id")?,
        uuid: get_role(row, role, "uuid")?,
        order_number: get_role(row, role, "order_number")?,
        instructions: get_role(row, role, "instructions")?,
        date_activated: get_role(row, role, "date_activated")?,
        auto_expire_date: get_role(row, role, "auto_expire_date")?,
        date_stopped: get_role(row, role, "date_stopped")?,
        voided: get_role(row, role, "voided")?,
        urgency: get_role(row, role, "urgency")?,
        order_action: get_role(row, role, "order_action")?,
        accession_number: get_role(row, role, "accession_number")?,
        concept: decode_concept(row, ColumnRole::SetMemberConcept, false)?,
    })
}

fn decode_drug(row: &PgRow) -> Result<DrugColumns, StorageError> {
    Ok(DrugColumns {
        drug_order_id: get(row, "drug_order_id")?,
        drug_id: get(row, "drug_id")?,
        drug_name: get(row, "drug_name")?,
        drug_strength: get(row, "drug_strength")?,
        drug_uuid: get(row, "drug_uuid")?,
        dose: get(row, "dose")?,
        dose_units: get(row, "dose_units")?,
        dose_units_name: get(row, "dose_units_name")?,
        frequency: get(row, "frequency")?,
        frequency_name: get(row, "frequency_name")?,
        duration: get(row, "duration")?,
        duration_units: get(row, "duration_units")?,
        duration_units_name: get(row, "duration_units_name")?,
        route: get(row, "route")?,
        route_name: get(row, "route_name")?,
        quantity: get(row, "quantity")?,
        quantity_units: get(row, "quantity_units")?,
        quantity_units_name: get(row, "quantity_units_name")?,
        as_needed: get(row, "as_needed")?,
        as_needed_condition: get(row, "as_needed_condition")?,
        dosing_type: get(row, "dosing_type")?,
        dosing_instructions: get(row, "dosing_instructions")?,
        num_refills: get(row, "num_refills")?,
        brand_name: get(row, "brand_name")?,
        dispense_as_written: get(row, "dispense_as_written")?,
        drug_non_coded: get(row, "drug_non_coded")?,
    })
}

fn decode_base(row: &PgRow, with_details: bool) -> Result<EnrichedOrderRow, StorageError> {
    Ok(EnrichedOrderRow {
        order: decode_order(row)?,
        provider: decode_provider(row)?,
        orderer: decode_person(row, ColumnRole::Orderer)?,
        patient: decode_person(row, ColumnRole::Patient)?,
        concept: decode_concept(row, ColumnRole::Concept, with_details)?,
    })
}

pub fn decode_enriched(row: &PgRow) -> Result<EnrichedOrderRow, StorageError> {
    decode_base(row, false)
}

pub fn decode_expansion(row: &PgRow) -> Result<ExpansionRow, StorageError> {
    Ok(ExpansionRow {
        base: decode_base(row, true)?,
        answer: decode_answer(row)?,
        set_member: decode_set_member(row)?,
        parent: decode_concept(row, ColumnRole::ParentConcept, true)?,
    })
}

pub fn decode_drug_order(row: &PgRow) -> Result<DrugOrderRow, StorageError> {
    Ok(DrugOrderRow {
        base: decode_base(row, false)?,
        drug: decode_drug(row)?,
    })
}

/// Decodes every row with `decode`, failing on the first bad row.
pub fn decode_all<T>(
    rows: &[PgRow],
    decode: impl Fn(&PgRow) -> Result<T, StorageError>,
) -> Result<Vec<T>, StorageError> {
    rows.iter().map(decode).collect()
}
