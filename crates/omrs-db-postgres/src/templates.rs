//! SQL text of the enrichment reads.
//!
//! Every template projects its tables under the role prefixes of
//! [`omrs_storage::rows`], so the decoder can read any template's rows with
//! the same column names. Templates carry a `{where_clause}` slot and named
//! `:param` placeholders; [`omrs_search::compile_named`] turns them into
//! positional binds.
//!
//! Bound parameters besides the filter keys:
//! - `:locale` on every template that resolves concept names,
//! - `:limit` / `:skip` on the paginated templates,
//! - `:panel_concept_id` / `:encounter_id` on the panel member read.

use std::sync::LazyLock;

use omrs_storage::ColumnRole;
use omrs_storage::rows::{
    ANSWER_FIELDS, ORDER_FIELDS, PERSON_FIELDS, PROVIDER_FIELDS, SET_MEMBER_FIELDS, order_column,
};

/// Selects one concept-name row per concept: the locale-preferred one, then
/// the lowest id.
fn concept_name_join(alias: &str, concept: &str, name_type: &str) -> String {
    format!(
        "LEFT JOIN LATERAL (
            SELECT concept_name_id, name, locale, locale_preferred, concept_name_type
            FROM concept_name
            WHERE concept_id = {concept}.concept_id
              AND locale = :locale
              AND concept_name_type = '{name_type}'
              AND voided = false
            ORDER BY locale_preferred DESC, concept_name_id
            LIMIT 1
        ) {alias} ON true"
    )
}

/// Joins a non-retired concept with its FULLY_SPECIFIED and SHORT names.
fn concept_joins(concept: &str, on: &str) -> String {
    format!(
        "LEFT JOIN concept {concept} ON {concept}.concept_id = {on} AND {concept}.retired = false
        {}
        {}",
        concept_name_join(&format!("{concept}_fsn"), concept, "FULLY_SPECIFIED"),
        concept_name_join(&format!("{concept}_sn"), concept, "SHORT"),
    )
}

fn concept_detail_joins(concept: &str) -> String {
    format!(
        "LEFT JOIN concept_datatype {concept}_dt
            ON {concept}_dt.concept_datatype_id = {concept}.datatype_id AND {concept}_dt.retired = false
        LEFT JOIN concept_class {concept}_cc
            ON {concept}_cc.concept_class_id = {concept}.class_id AND {concept}_cc.retired = false"
    )
}

/// Joins a non-voided person with its preferred non-voided name.
fn person_joins(person: &str, on: &str) -> String {
    format!(
        "LEFT JOIN person {person} ON {person}.person_id = {on} AND {person}.voided = false
        LEFT JOIN LATERAL (
            SELECT prefix, given_name, middle_name, family_name_prefix, family_name,
                   family_name2, family_name_suffix, degree
            FROM person_name
            WHERE person_id = {person}.person_id
              AND preferred = true
              AND voided = false
            ORDER BY person_name_id
            LIMIT 1
        ) {person}_name ON true"
    )
}

fn concept_columns(concept: &str, role: ColumnRole) -> Vec<String> {
    let fsn = format!("{concept}_fsn");
    vec![
        format!("{concept}.concept_id AS {}", role.column("id")),
        format!("{concept}.uuid AS {}", role.column("uuid")),
        format!(
            "COALESCE({concept}_sn.name, {concept}.short_name) AS {}",
            role.column("short_name")
        ),
        format!("{concept}.description AS {}", role.column("description")),
        format!("{concept}.is_set AS {}", role.column("is_set")),
        format!("{fsn}.concept_name_id AS {}", role.column("name_id")),
        format!("{fsn}.name AS {}", role.column("name")),
        format!("{fsn}.locale AS {}", role.column("name_locale")),
        format!(
            "{fsn}.locale_preferred AS {}",
            role.column("name_locale_preferred")
        ),
        format!("{fsn}.concept_name_type AS {}", role.column("name_type")),
    ]
}

fn concept_detail_columns(concept: &str, role: ColumnRole) -> Vec<String> {
    let dt = format!("{concept}_dt");
    let cc = format!("{concept}_cc");
    vec![
        format!("{dt}.concept_datatype_id AS {}", role.column("datatype_id")),
        format!("{dt}.uuid AS {}", role.column("datatype_uuid")),
        format!("{dt}.name AS {}", role.column("datatype_name")),
        format!(
            "{dt}.hl7_abbreviation AS {}",
            role.column("datatype_hl7_abbreviation")
        ),
        format!("{dt}.description AS {}", role.column("datatype_description")),
        format!("{cc}.concept_class_id AS {}", role.column("class_id")),
        format!("{cc}.uuid AS {}", role.column("class_uuid")),
        format!("{cc}.name AS {}", role.column("class_name")),
        format!("{cc}.description AS {}", role.column("class_description")),
    ]
}

fn person_columns(person: &str, role: ColumnRole) -> Vec<String> {
    let name = format!("{person}_name");
    PERSON_FIELDS
        .iter()
        .enumerate()
        .filter(|(_, field)| **field != "degree" || role.carries_degree())
        .map(|(i, field)| {
            // The first four fields live on `person`, the rest on the name.
            let source = if i < 4 { person } else { name.as_str() };
            format!("{source}.{field} AS {}", role.column(field))
        })
        .collect()
}

fn order_columns() -> Vec<String> {
    ORDER_FIELDS
        .iter()
        .map(|field| match order_column(field) {
            alias if alias == *field => format!("o.{field}"),
            alias => format!("o.{field} AS {alias}"),
        })
        .collect()
}

fn provider_columns() -> Vec<String> {
    let role = ColumnRole::Provider;
    PROVIDER_FIELDS
        .iter()
        .map(|field| {
            let source = if *field == "id" { "provider_id" } else { field };
            format!("p.{source} AS {}", role.column(field))
        })
        .collect()
}

/// Answer concepts; the name comes from the answer's FULLY_SPECIFIED pick.
fn answer_columns() -> Vec<String> {
    let role = ColumnRole::Answer;
    ANSWER_FIELDS
        .iter()
        .map(|field| {
            let source = if *field == "name" { "ac_fsn" } else { "ac" };
            format!("{source}.{field} AS {}", role.column(field))
        })
        .collect()
}

fn set_member_columns() -> Vec<String> {
    let role = ColumnRole::SetMember;
    SET_MEMBER_FIELDS
        .iter()
        .map(|field| format!("smo.{field} AS {}", role.column(field)))
        .collect()
}

fn base_columns() -> Vec<String> {
    let mut columns = order_columns();
    columns.extend(provider_columns());
    columns.extend(person_columns("op", ColumnRole::Orderer));
    columns.extend(person_columns("pt", ColumnRole::Patient));
    columns.extend(concept_columns("c", ColumnRole::Concept));
    columns
}

/// Orderer, patient and concept joins shared by every template.
fn enrichment_joins() -> String {
    format!(
        "LEFT JOIN provider p ON p.provider_id = o.orderer AND p.retired = false
        {}
        {}
        {}",
        person_joins("op", "p.person_id"),
        person_joins("pt", "o.patient_id"),
        concept_joins("c", "o.concept_id"),
    )
}

const VISIT_JOINS: &str = "INNER JOIN encounter e ON e.encounter_id = o.encounter_id
        INNER JOIN visit v ON v.visit_id = e.visit_id";

fn select_list(columns: &[String]) -> String {
    columns.join(",\n            ")
}

/// Existence probe: a single-table read, no joins.
pub const PROBE_SQL: &str = "SELECT o.order_id, o.order_type_id, o.concept_id, o.encounter_id
    FROM orders o
    WHERE {where_clause}
    ORDER BY o.order_id
    LIMIT 1";

/// Base template: one row per order.
pub static BASE_SQL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "SELECT
            {columns}
        FROM orders o
        {VISIT_JOINS}
        {joins}
        WHERE {{where_clause}}
        ORDER BY o.order_id
        LIMIT :limit OFFSET :skip",
        columns = select_list(&base_columns()),
        joins = enrichment_joins(),
    )
});

/// Expansion template.
///
/// Pagination runs over distinct orders in `paged_orders`; the outer query
/// then multiplies each order by its answers and panel members. Set members
/// only join when the ordered concept is a panel, the parent only when it
/// is not. The parent is the lowest-id active panel containing the concept.
pub static EXPANSION_SQL: LazyLock<String> = LazyLock::new(|| {
    let mut columns = base_columns();
    columns.extend(concept_detail_columns("c", ColumnRole::Concept));
    columns.extend(answer_columns());
    columns.extend(set_member_columns());
    columns.extend(concept_columns("mc", ColumnRole::SetMemberConcept));
    columns.extend(concept_columns("pc", ColumnRole::ParentConcept));
    columns.extend(concept_detail_columns("pc", ColumnRole::ParentConcept));

    format!(
        "WITH paged_orders AS (
            SELECT o.order_id
            FROM orders o
            {VISIT_JOINS}
            LEFT JOIN concept c ON c.concept_id = o.concept_id AND c.retired = false
            WHERE {{where_clause}}
            ORDER BY o.order_id
            LIMIT :limit OFFSET :skip
        )
        SELECT
            {columns}
        FROM paged_orders po
        INNER JOIN orders o ON o.order_id = po.order_id
        {VISIT_JOINS}
        {joins}
        {concept_details}
        LEFT JOIN concept_answer ca ON ca.concept_id = c.concept_id
        LEFT JOIN concept ac ON ac.concept_id = ca.answer_concept AND ac.retired = false
        {answer_name}
        LEFT JOIN concept_set mcs ON mcs.concept_set = c.concept_id AND c.is_set = true
        {member_concept}
        LEFT JOIN orders smo
            ON smo.concept_id = mc.concept_id
           AND smo.encounter_id = o.encounter_id
           AND smo.voided = false
        LEFT JOIN LATERAL (
            SELECT pcs.concept_set
            FROM concept_set pcs
            INNER JOIN concept owner ON owner.concept_id = pcs.concept_set AND owner.retired = false
            WHERE pcs.concept_id = c.concept_id AND c.is_set = false
            ORDER BY pcs.concept_set
            LIMIT 1
        ) parent_pick ON true
        {parent_concept}
        {parent_details}
        ORDER BY o.order_id, mc.concept_id, smo.order_id, ca.sort_weight, ac.concept_id",
        columns = select_list(&columns),
        joins = enrichment_joins(),
        concept_details = concept_detail_joins("c"),
        answer_name = concept_name_join("ac_fsn", "ac", "FULLY_SPECIFIED"),
        member_concept = concept_joins("mc", "mcs.concept_id"),
        parent_concept = concept_joins("pc", "parent_pick.concept_set"),
        parent_details = concept_detail_joins("pc"),
    )
});

/// Drug template: base plus drug_order, drug and the coded-field names.
pub static DRUG_SQL: LazyLock<String> = LazyLock::new(|| {
    drug_template(
        VISIT_JOINS,
        "{where_clause}",
        "ORDER BY o.order_id
        LIMIT :limit OFFSET :skip",
    )
});

/// Drug details of one order, without the encounter and visit joins.
pub static FALLBACK_DRUG_SQL: LazyLock<String> =
    LazyLock::new(|| drug_template("", "o.order_id = :order_id", "LIMIT 1"));

fn drug_template(scope_joins: &str, predicate: &str, tail: &str) -> String {
    let mut columns = base_columns();
    columns.extend(
        [
            "dro.order_id AS drug_order_id",
            "d.drug_id AS drug_id",
            "d.name AS drug_name",
            "d.strength AS drug_strength",
            "d.uuid AS drug_uuid",
            "dro.dose",
            "dro.dose_units",
            "dose_units_fsn.name AS dose_units_name",
            "dro.frequency",
            "frequency_fsn.name AS frequency_name",
            "dro.duration",
            "dro.duration_units",
            "duration_units_fsn.name AS duration_units_name",
            "dro.route",
            "route_fsn.name AS route_name",
            "dro.quantity",
            "dro.quantity_units",
            "quantity_units_fsn.name AS quantity_units_name",
            "dro.as_needed",
            "dro.as_needed_condition",
            "dro.dosing_type",
            "dro.dosing_instructions",
            "dro.num_refills",
            "dro.brand_name",
            "dro.dispense_as_written",
            "dro.drug_non_coded",
        ]
        .map(String::from),
    );

    format!(
        "SELECT
            {columns}
        FROM orders o
        {scope_joins}
        INNER JOIN drug_order dro ON dro.order_id = o.order_id
        {joins}
        LEFT JOIN drug d ON d.drug_id = dro.drug_inventory_id AND d.retired = false
        LEFT JOIN order_frequency ofr ON ofr.order_frequency_id = dro.frequency AND ofr.retired = false
        {dose_units}
        {frequency}
        {duration_units}
        {route}
        {quantity_units}
        WHERE {predicate}
        {tail}",
        columns = select_list(&columns),
        joins = enrichment_joins(),
        dose_units = coded_name_join("dose_units", "dro.dose_units"),
        frequency = coded_name_join("frequency", "ofr.concept_id"),
        duration_units = coded_name_join("duration_units", "dro.duration_units"),
        route = coded_name_join("route", "dro.route"),
        quantity_units = coded_name_join("quantity_units", "dro.quantity_units"),
    )
}

/// Resolves the name of a coded concept reference.
fn coded_name_join(prefix: &str, concept_ref: &str) -> String {
    format!(
        "LEFT JOIN concept {prefix} ON {prefix}.concept_id = {concept_ref} AND {prefix}.retired = false
        {}",
        concept_name_join(&format!("{prefix}_fsn"), prefix, "FULLY_SPECIFIED")
    )
}

/// Fallback read: the base projection without the encounter and visit joins.
pub static FALLBACK_ORDER_SQL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "SELECT
            {columns}
        FROM orders o
        {joins}
        WHERE o.order_id = :order_id
        LIMIT 1",
        columns = select_list(&base_columns()),
        joins = enrichment_joins(),
    )
});

/// Panel members read straight off the membership table.
pub static PANEL_MEMBERS_SQL: LazyLock<String> = LazyLock::new(|| {
    let mut columns = set_member_columns();
    columns.extend(concept_columns("mc", ColumnRole::SetMemberConcept));

    format!(
        "SELECT
            {columns}
        FROM concept_set mcs
        {member_concept}
        INNER JOIN orders smo
            ON smo.concept_id = mcs.concept_id
           AND smo.encounter_id = :encounter_id
           AND smo.voided = false
        WHERE mcs.concept_set = :panel_concept_id
        ORDER BY mcs.concept_id, smo.order_id",
        columns = select_list(&columns),
        member_concept = concept_joins("mc", "mcs.concept_id"),
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use omrs_search::{
        NamedParam, OrderFilter, SqlValue, WHERE_CLAUSE_SLOT, WhereClause, build_where_clause,
        compile_named,
    };
    use omrs_storage::rows::{CONCEPT_DETAIL_FIELDS, CONCEPT_FIELDS, DRUG_FIELDS};

    fn aliases(sql: &str) -> Vec<String> {
        sql.split(" AS ")
            .skip(1)
            .filter_map(|rest| rest.split([',', '\n', ' ']).next())
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_templates_carry_where_slot() {
        assert!(PROBE_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(BASE_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(EXPANSION_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(DRUG_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(!FALLBACK_ORDER_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(!FALLBACK_DRUG_SQL.contains(WHERE_CLAUSE_SLOT));
        assert!(!PANEL_MEMBERS_SQL.contains(WHERE_CLAUSE_SLOT));
    }

    #[test]
    fn test_base_projects_role_columns() {
        let sql = BASE_SQL.as_str();
        for field in CONCEPT_FIELDS {
            assert!(sql.contains(&format!("AS {}", ColumnRole::Concept.column(field))));
        }
        for field in PROVIDER_FIELDS {
            assert!(sql.contains(&format!("AS {}", ColumnRole::Provider.column(field))));
        }
        assert!(sql.contains("p.provider_id AS provider_id"));
        assert!(sql.contains("AS orderer_degree"));
        assert!(!sql.contains("AS patient_degree"));
        assert!(sql.contains("o.concept_id AS order_concept_id"));
        assert!(sql.contains("c.concept_id AS concept_id"));
    }

    #[test]
    fn test_expansion_projects_parent_and_members() {
        let sql = EXPANSION_SQL.as_str();
        for field in CONCEPT_FIELDS.iter().chain(CONCEPT_DETAIL_FIELDS) {
            assert!(sql.contains(&format!("AS {}", ColumnRole::ParentConcept.column(field))));
        }
        for field in ANSWER_FIELDS {
            assert!(sql.contains(&format!("AS {}", ColumnRole::Answer.column(field))));
        }
        assert!(sql.contains("ac_fsn.name AS answer_name"));
        assert!(sql.contains("AS set_member_order_id"));
        assert!(sql.contains("AS set_member_concept_id"));
        assert!(sql.contains("WITH paged_orders AS"));
        assert!(sql.contains("ORDER BY o.order_id, mc.concept_id, smo.order_id"));
    }

    #[test]
    fn test_drug_projects_drug_fields() {
        for sql in [DRUG_SQL.as_str(), FALLBACK_DRUG_SQL.as_str()] {
            for field in DRUG_FIELDS {
                assert!(sql.contains(field), "missing drug column {field}");
            }
        }
        assert!(DRUG_SQL.contains("INNER JOIN visit v"));
    }

    #[test]
    fn test_aliases_are_unique() {
        for sql in [BASE_SQL.as_str(), EXPANSION_SQL.as_str(), DRUG_SQL.as_str()] {
            let mut seen = aliases(sql);
            let total = seen.len();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), total);
        }
    }

    #[test]
    fn test_templates_compile_with_all_params() {
        let filter = OrderFilter::new().patient_id(85).urgency("STAT");
        let clause = build_where_clause(&filter);
        let extra: Vec<NamedParam> = vec![
            ("locale".to_string(), SqlValue::from("en")),
            ("limit".to_string(), SqlValue::Integer(10)),
            ("skip".to_string(), SqlValue::Integer(0)),
        ];

        for template in [BASE_SQL.as_str(), EXPANSION_SQL.as_str(), DRUG_SQL.as_str()] {
            let built = compile_named(template, &clause, &extra).unwrap();
            assert!(!built.sql.contains(":locale"));
            assert!(built.sql.contains("o.patient_id = $"));
            assert!(built.sql.contains("'FULLY_SPECIFIED'"));
            assert_eq!(built.params.len(), 5);
        }
    }

    #[test]
    fn test_fallback_and_panel_compile() {
        let clause = WhereClause::new();
        let built = compile_named(
            &FALLBACK_ORDER_SQL,
            &clause,
            &[
                ("order_id".to_string(), SqlValue::Integer(9000)),
                ("locale".to_string(), SqlValue::from("en")),
            ],
        )
        .unwrap();
        assert!(!built.sql.contains("INNER JOIN visit"));
        assert_eq!(built.params.len(), 2);

        let built = compile_named(
            &FALLBACK_DRUG_SQL,
            &clause,
            &[
                ("order_id".to_string(), SqlValue::Integer(9600)),
                ("locale".to_string(), SqlValue::from("en")),
            ],
        )
        .unwrap();
        assert!(!built.sql.contains("INNER JOIN visit"));
        assert!(built.sql.contains("INNER JOIN drug_order dro"));
        assert!(built.sql.contains("o.order_id = $"));
        assert_eq!(built.params.len(), 2);

        let built = compile_named(
            &PANEL_MEMBERS_SQL,
            &clause,
            &[
                ("panel_concept_id".to_string(), SqlValue::Integer(500)),
                ("encounter_id".to_string(), SqlValue::Integer(77)),
                ("locale".to_string(), SqlValue::from("en")),
            ],
        )
        .unwrap();
        assert_eq!(built.params.len(), 3);
    }
}
