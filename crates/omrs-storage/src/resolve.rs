//! Resolution of decoded column groups into domain summaries.
//!
//! Both the row folder and the fallback expander go through these functions,
//! so a person or concept looks the same whichever path produced it. A group
//! whose key column is `NULL` resolves to `None`: the join found nothing, or
//! only voided/retired rows.

use omrs_core::{
    ConceptAnswerSummary, ConceptClassSummary, ConceptDatatypeSummary, ConceptNameLocale,
    ConceptSummary, DrugOrderDetail, OrderRecord, OrdererSummary, PersonSummary, SetMemberOrder,
};

use crate::rows::{
    AnswerColumns, ClassColumns, ConceptColumns, DatatypeColumns, DrugColumns, EnrichedOrderRow,
    OrderColumns, PersonColumns, ProviderColumns, SetMemberColumns,
};

pub fn resolve_person(cols: &PersonColumns) -> Option<PersonSummary> {
    let person_id = cols.person_id?;
    Some(PersonSummary {
        person_id,
        uuid: cols.uuid.clone(),
        name: cols.name.assemble(),
        gender: cols.gender.clone(),
        birthdate: cols.birthdate,
    })
}

/// Resolves the orderer through its provider.
///
/// The summary exists only when the provider's person resolved. Its name
/// falls back to the provider's own name when the person has no usable one.
pub fn resolve_orderer(
    provider: &ProviderColumns,
    person: &PersonColumns,
) -> Option<OrdererSummary> {
    let mut person = resolve_person(person)?;
    if person.name.is_none() {
        person.name = provider
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
    }

    Some(OrdererSummary {
        person,
        provider_id: provider.provider_id,
        provider_name: provider.name.clone(),
        provider_identifier: provider.identifier.clone(),
        provider_uuid: provider.uuid.clone(),
    })
}

fn resolve_datatype(cols: &DatatypeColumns) -> Option<ConceptDatatypeSummary> {
    Some(ConceptDatatypeSummary {
        concept_datatype_id: cols.datatype_id?,
        uuid: cols.uuid.clone(),
        name: cols.name.clone(),
        hl7_abbreviation: cols.hl7_abbreviation.clone(),
        description: cols.description.clone(),
    })
}

fn resolve_class(cols: &ClassColumns) -> Option<ConceptClassSummary> {
    Some(ConceptClassSummary {
        concept_class_id: cols.class_id?,
        uuid: cols.uuid.clone(),
        name: cols.name.clone(),
        description: cols.description.clone(),
    })
}

/// Resolves a concept. Answers are never set here; only the folder knows
/// them.
pub fn resolve_concept(cols: &ConceptColumns) -> Option<ConceptSummary> {
    let concept_id = cols.concept_id?;

    let locale = cols.name_id.map(|concept_name_id| ConceptNameLocale {
        concept_name_id: Some(concept_name_id),
        locale: cols.name_locale.clone(),
        locale_preferred: cols.name_locale_preferred,
        concept_name_type: cols.name_type.clone(),
    });

    Some(ConceptSummary {
        concept_id,
        uuid: cols.uuid.clone(),
        name: cols.name.clone(),
        short_name: cols.short_name.clone(),
        description: cols.description.clone(),
        is_set: cols.is_set.unwrap_or(false),
        locale,
        datatype: resolve_datatype(&cols.datatype),
        concept_class: resolve_class(&cols.class),
        answers: None,
    })
}

pub fn resolve_answer(cols: &AnswerColumns) -> Option<ConceptAnswerSummary> {
    Some(ConceptAnswerSummary {
        concept_id: cols.concept_id?,
        uuid: cols.uuid.clone(),
        name: cols.name.clone(),
    })
}

pub fn resolve_set_member(cols: &SetMemberColumns) -> Option<SetMemberOrder> {
    Some(SetMemberOrder {
        order_id: cols.order_id?,
        uuid: cols.uuid.clone(),
        order_number: cols.order_number.clone(),
        instructions: cols.instructions.clone(),
        date_activated: cols.date_activated,
        auto_expire_date: cols.auto_expire_date,
        date_stopped: cols.date_stopped,
        voided: cols.voided,
        urgency: cols.urgency.clone(),
        order_action: cols.order_action.clone(),
        accession_number: cols.accession_number.clone(),
        concept_info: resolve_concept(&cols.concept),
    })
}

/// Resolves prescription details; `None` when the order has no drug_order row.
pub fn resolve_drug(cols: &DrugColumns) -> Option<DrugOrderDetail> {
    cols.drug_order_id?;
    Some(DrugOrderDetail {
        drug_id: cols.drug_id,
        drug_name: cols.drug_name.clone(),
        drug_strength: cols.drug_strength.clone(),
        drug_uuid: cols.drug_uuid.clone(),
        dose: cols.dose,
        dose_units: cols.dose_units,
        dose_units_name: cols.dose_units_name.clone(),
        frequency: cols.frequency,
        frequency_name: cols.frequency_name.clone(),
        duration: cols.duration,
        duration_units: cols.duration_units,
        duration_units_name: cols.duration_units_name.clone(),
        route: cols.route,
        route_name: cols.route_name.clone(),
        quantity: cols.quantity,
        quantity_units: cols.quantity_units,
        quantity_units_name: cols.quantity_units_name.clone(),
        as_needed: cols.as_needed,
        as_needed_condition: cols.as_needed_condition.clone(),
        dosing_type: cols.dosing_type.clone(),
        dosing_instructions: cols.dosing_instructions.clone(),
        num_refills: cols.num_refills,
        brand_name: cols.brand_name.clone(),
        dispense_as_written: cols.dispense_as_written,
        drug_non_coded: cols.drug_non_coded.clone(),
    })
}

fn resolve_scalars(cols: &OrderColumns) -> OrderRecord {
    OrderRecord {
        order_id: cols.order_id,
        order_type_id: cols.order_type_id,
        concept_id: cols.concept_id,
        orderer: cols.orderer,
        encounter_id: cols.encounter_id,
        instructions: cols.instructions.clone(),
        date_activated: cols.date_activated,
        auto_expire_date: cols.auto_expire_date,
        date_stopped: cols.date_stopped,
        order_reason: cols.order_reason,
        order_reason_non_coded: cols.order_reason_non_coded.clone(),
        creator: cols.creator,
        date_created: cols.date_created,
        voided: cols.voided,
        voided_by: cols.voided_by,
        date_voided: cols.date_voided,
        void_reason: cols.void_reason.clone(),
        patient_id: cols.patient_id,
        accession_number: cols.accession_number.clone(),
        uuid: cols.uuid.clone(),
        urgency: cols.urgency.clone(),
        order_number: cols.order_number.clone(),
        previous_order_id: cols.previous_order_id,
        order_action: cols.order_action.clone(),
        comment_to_fulfiller: cols.comment_to_fulfiller.clone(),
        care_setting: cols.care_setting,
        scheduled_date: cols.scheduled_date,
        order_group_id: cols.order_group_id,
        sort_weight: cols.sort_weight,
        fulfiller_comment: cols.fulfiller_comment.clone(),
        fulfiller_status: cols.fulfiller_status.clone(),
        form_namespace_and_path: cols.form_namespace_and_path.clone(),
        orderer_info: None,
        patient_info: None,
        concept_info: None,
        drug_order_info: None,
    }
}

/// Builds the order record with orderer, patient and concept resolved.
pub fn resolve_order(row: &EnrichedOrderRow) -> OrderRecord {
    OrderRecord {
        orderer_info: resolve_orderer(&row.provider, &row.orderer),
        patient_info: resolve_person(&row.patient),
        concept_info: resolve_concept(&row.concept),
        ..resolve_scalars(&row.order)
    }
}
