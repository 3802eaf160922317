use anyhow::{Context, Result};
use omrs_db_postgres::PostgresOrderStore;
use omrs_search::OrderFilter;
use omrs_storage::{OrderSelector, Page, StorageError};
use tracing::debug;

use crate::cli::{ExpandArgs, ListArgs, OutputFormat, QueryArgs};
use crate::config::PagingConfig;
use crate::output;

/// Filter and page of a listing command.
///
/// Unknown filter keys are dropped by the filter itself; malformed values are
/// rejected before any query runs.
pub fn build_query(args: &QueryArgs, paging: &PagingConfig) -> Result<(OrderFilter, Page)> {
    let filter = OrderFilter::from_pairs(args.filters.iter().map(|(k, v)| (k, v)))
        .map_err(StorageError::from)?;

    let requested = args.limit.unwrap_or(paging.default_limit);
    let page = Page::clamped(args.skip, requested, paging.max_limit);
    if page.limit != requested {
        debug!(requested, limit = page.limit, "limit clamped");
    }

    Ok((filter, page))
}

pub async fn expand(store: &PostgresOrderStore, args: &ExpandArgs, format: OutputFormat) -> Result<()> {
    let selector = OrderSelector::from_parts(args.id, args.uuid.as_deref())?;

    let session = store.session().await.context("failed to open read session")?;
    let expanded = session
        .enrichment()
        .get_single_order_with_expansion(selector)
        .await?;
    session.finish().await?;

    match format {
        OutputFormat::Json => output::print_json(&expanded),
        OutputFormat::Table => output::print_expanded(std::slice::from_ref(&expanded), format),
    }
}

pub async fn get(store: &PostgresOrderStore, order_id: i32, format: OutputFormat) -> Result<()> {
    let order = store.enrichment().get_enriched_order(order_id).await?;

    match format {
        OutputFormat::Json => output::print_json(&order),
        OutputFormat::Table => output::print_orders(std::slice::from_ref(&order), format),
    }
}

pub async fn list(
    store: &PostgresOrderStore,
    args: &ListArgs,
    paging: &PagingConfig,
    format: OutputFormat,
) -> Result<()> {
    let (filter, page) = build_query(&args.query, paging)?;
    let enrichment = store.enrichment();

    if args.expand {
        let orders = enrichment.list_expanded_orders(&filter, page).await?;
        output::print_expanded(&orders, format)
    } else {
        let orders = enrichment.list_enriched_orders(&filter, page).await?;
        output::print_orders(&orders, format)
    }
}

pub async fn drugs(
    store: &PostgresOrderStore,
    args: &QueryArgs,
    paging: &PagingConfig,
    format: OutputFormat,
) -> Result<()> {
    let (filter, page) = build_query(args, paging)?;
    let orders = store.enrichment().list_drug_orders(&filter, page).await?;
    output::print_drug_orders(&orders, format)
}
