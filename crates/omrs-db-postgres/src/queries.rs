//! The enrichment reads, generic over the executor so the pool-backed
//! store and the transaction-backed session share them.

use omrs_search::{OrderFilter, SqlValue, WhereClause, build_where_clause};
use omrs_storage::{
    DrugOrderRow, EnrichedOrderRow, ExpansionRow, OrderProbe, OrderSelector, Page,
    SetMemberColumns, StorageError,
};
use sqlx_core::executor::Executor;
use sqlx_postgres::Postgres;

use crate::decode::{
    decode_all, decode_drug_order, decode_enriched, decode_expansion, decode_probe,
    decode_set_member,
};
use crate::executor::{fetch_rows, locale_param, page_params};
use crate::templates::{
    BASE_SQL, DRUG_SQL, EXPANSION_SQL, FALLBACK_DRUG_SQL, FALLBACK_ORDER_SQL, PANEL_MEMBERS_SQL,
    PROBE_SQL,
};

pub async fn probe_order<'e, E>(
    executor: E,
    selector: &OrderSelector,
) -> Result<Option<OrderProbe>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let clause = build_where_clause(&selector.to_filter());
    let rows = fetch_rows(executor, PROBE_SQL, &clause, &[]).await?;
    rows.first().map(decode_probe).transpose()
}

pub async fn enriched_rows<'e, E>(
    executor: E,
    locale: &str,
    filter: &OrderFilter,
    page: Page,
) -> Result<Vec<EnrichedOrderRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let [limit, skip] = page_params(page);
    let extra = [locale_param(locale), limit, skip];
    let rows = fetch_rows(executor, &BASE_SQL, &build_where_clause(filter), &extra).await?;
    decode_all(&rows, decode_enriched)
}

pub async fn expansion_rows<'e, E>(
    executor: E,
    locale: &str,
    filter: &OrderFilter,
    page: Page,
) -> Result<Vec<ExpansionRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let [limit, skip] = page_params(page);
    let extra = [locale_param(locale), limit, skip];
    let rows = fetch_rows(executor, &EXPANSION_SQL, &build_where_clause(filter), &extra).await?;
    decode_all(&rows, decode_expansion)
}

pub async fn drug_order_rows<'e, E>(
    executor: E,
    locale: &str,
    filter: &OrderFilter,
    page: Page,
) -> Result<Vec<DrugOrderRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let [limit, skip] = page_params(page);
    let extra = [locale_param(locale), limit, skip];
    let rows = fetch_rows(executor, &DRUG_SQL, &build_where_clause(filter), &extra).await?;
    decode_all(&rows, decode_drug_order)
}

pub async fn fallback_order_row<'e, E>(
    executor: E,
    locale: &str,
    order_id: i32,
) -> Result<Option<EnrichedOrderRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let extra = [
        locale_param(locale),
        ("order_id".to_string(), SqlValue::from(order_id)),
    ];
    let rows = fetch_rows(executor, &FALLBACK_ORDER_SQL, &WhereClause::new(), &extra).await?;
    rows.first().map(decode_enriched).transpose()
}

pub async fn fallback_drug_row<'e, E>(
    executor: E,
    locale: &str,
    order_id: i32,
) -> Result<Option<DrugOrderRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let extra = [
        locale_param(locale),
        ("order_id".to_string(), SqlValue::from(order_id)),
    ];
    let rows = fetch_rows(executor, &FALLBACK_DRUG_SQL, &WhereClause::new(), &extra).await?;
    rows.first().map(decode_drug_order).transpose()
}

pub async fn panel_member_rows<'e, E>(
    executor: E,
    locale: &str,
    panel_concept_id: i32,
    encounter_id: i32,
) -> Result<Vec<SetMemberColumns>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let extra = [
        locale_param(locale),
        ("panel_concept_id".to_string(), SqlValue::from(panel_concept_id)),
        ("encounter_id".to_string(), SqlValue::from(encounter_id)),
    ];
    let rows = fetch_rows(executor, &PANEL_MEMBERS_SQL, &WhereClause::new(), &extra).await?;
    decode_all(&rows, decode_set_member)
}
