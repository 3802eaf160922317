//! The read contract an enrichment store must satisfy.

use async_trait::async_trait;
use omrs_search::OrderFilter;

use crate::error::StorageError;
use crate::rows::{DrugOrderRow, EnrichedOrderRow, ExpansionRow, OrderProbe, SetMemberColumns};
use crate::types::{OrderSelector, Page};

/// Row source for the enrichment engine.
///
/// Every method is one read statement. Implementations return decoded rows
/// and leave all folding to the engine. They must not retry: store failures
/// surface as [`StorageError::QueryFailed`] carrying the store's message.
///
/// The engine calls these sequentially, so an implementation may serialise
/// them through a single connection or transaction.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Cheap existence check run before any multi-join read.
    ///
    /// Returns `Ok(None)` when no order matches.
    async fn probe_order(&self, selector: &OrderSelector) -> Result<Option<OrderProbe>, StorageError>;

    /// Rows of the base template, one per order, in `order_id` order.
    async fn enriched_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<EnrichedOrderRow>, StorageError>;

    /// Rows of the expansion template.
    ///
    /// `page` applies to distinct orders. Rows come ordered by order id, then
    /// set-member concept id, then set-member order id.
    async fn expansion_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<ExpansionRow>, StorageError>;

    /// Rows of the drug template. Only orders with a drug_order row match.
    async fn drug_order_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<DrugOrderRow>, StorageError>;

    /// Minimal single-row read of an order's scalars, people and concept,
    /// without the encounter/visit joins.
    async fn fallback_order_row(
        &self,
        order_id: i32,
    ) -> Result<Option<EnrichedOrderRow>, StorageError>;

    /// Drug template row of one order, without the encounter/visit joins.
    async fn fallback_drug_row(&self, order_id: i32) -> Result<Option<DrugOrderRow>, StorageError>;

    /// Sibling orders in `encounter_id` whose concept is a member of the
    /// panel `panel_concept_id`, read straight from the membership table.
    async fn panel_member_rows(
        &self,
        panel_concept_id: i32,
        encounter_id: i32,
    ) -> Result<Vec<SetMemberColumns>, StorageError>;
}
