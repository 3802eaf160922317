//! The order enrichment service.

use omrs_core::{DrugOrderDetail, ExpandedOrder, OrderRecord};
use omrs_search::OrderFilter;
use tracing::{debug, instrument, warn};

use crate::error::StorageError;
use crate::fallback::FallbackExpander;
use crate::fold::RowFolder;
use crate::resolve::resolve_drug;
use crate::traits::OrderStore;
use crate::types::{ExpansionPolicy, OrderSelector, Page};

/// Entry points of the enrichment engine over an [`OrderStore`].
///
/// All reads of one call run sequentially against the borrowed store, so a
/// store that wraps a single transaction gives every call one consistent
/// scope. Concept names come back in whatever locale the store binds.
pub struct OrderEnrichment<'a, S: OrderStore + ?Sized> {
    store: &'a S,
    policy: ExpansionPolicy,
}

impl<'a, S: OrderStore + ?Sized> OrderEnrichment<'a, S> {
    pub fn new(store: &'a S, policy: ExpansionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ExpansionPolicy {
        self.policy
    }

    /// Reads one order with its panel members or parent panel.
    ///
    /// The existence probe runs first, so a missing order costs one cheap
    /// read. When the expansion read yields nothing for the probed order,
    /// the fallback expander rebuilds it. Drug orders additionally get
    /// their prescription details, read without the visit join when the
    /// fallback ran.
    #[instrument(skip(self, selector), fields(selector = %selector))]
    pub async fn get_single_order_with_expansion(
        &self,
        selector: OrderSelector,
    ) -> Result<ExpandedOrder, StorageError> {
        let probe = self
            .store
            .probe_order(&selector)
            .await?
            .ok_or_else(|| StorageError::not_found(selector.to_string()))?;

        let filter = OrderFilter::new().order_id(probe.order_id);
        let rows = self.store.expansion_rows(&filter, Page::single()).await?;
        debug!(rows = rows.len(), "expansion rows fetched");

        let (mut expanded, fell_back) = match RowFolder::fold_expansion(&rows) {
            Some(expanded) => (expanded, false),
            None if self.policy.fallback_enabled => {
                warn!(
                    order_id = probe.order_id,
                    "expansion query returned no rows for an existing order, using fallback"
                );
                (FallbackExpander::new(self.store).expand(&probe).await?, true)
            }
            None => {
                return Err(StorageError::internal(format!(
                    "expansion query returned no rows for existing order {}",
                    probe.order_id
                )));
            }
        };

        if self.policy.is_drug_order_type(probe.order_type_id) {
            expanded.order.drug_order_info =
                self.drug_details(&filter, probe.order_id, fell_back).await?;
            if expanded.order.drug_order_info.is_none() {
                warn!(order_id = probe.order_id, "drug order has no prescription details");
            }
        }

        Ok(expanded)
    }

    async fn drug_details(
        &self,
        filter: &OrderFilter,
        order_id: i32,
        fell_back: bool,
    ) -> Result<Option<DrugOrderDetail>, StorageError> {
        let row = if fell_back {
            self.store.fallback_drug_row(order_id).await?
        } else {
            self.store
                .drug_order_rows(filter, Page::single())
                .await?
                .into_iter()
                .next()
        };
        Ok(row.and_then(|row| resolve_drug(&row.drug)))
    }

    /// Reads one order through the base template.
    #[instrument(skip(self))]
    pub async fn get_enriched_order(&self, order_id: i32) -> Result<OrderRecord, StorageError> {
        let filter = OrderFilter::new().order_id(order_id);
        let rows = self.store.enriched_rows(&filter, Page::single()).await?;
        rows.first()
            .map(RowFolder::fold_enriched)
            .ok_or_else(|| StorageError::not_found(format!("order_id={order_id}")))
    }

    #[instrument(skip(self, filter), fields(conditions = filter.len()))]
    pub async fn list_enriched_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<OrderRecord>, StorageError> {
        let rows = self.store.enriched_rows(filter, page).await?;
        Ok(rows.iter().map(RowFolder::fold_enriched).collect())
    }

    /// Lists orders with expansion. The page counts orders, not rows.
    #[instrument(skip(self, filter), fields(conditions = filter.len()))]
    pub async fn list_expanded_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<ExpandedOrder>, StorageError> {
        let rows = self.store.expansion_rows(filter, page).await?;
        Ok(RowFolder::fold_expansion_pages(&rows))
    }

    #[instrument(skip(self, filter), fields(conditions = filter.len()))]
    pub async fn list_drug_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<OrderRecord>, StorageError> {
        let rows = self.store.drug_order_rows(filter, page).await?;
        Ok(rows.iter().map(RowFolder::fold_drug).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{DrugColumns, DrugOrderRow, ExpansionRow, OrderProbe};
    use crate::testing::{FakeOrderStore, Query, concept, enriched_row, set_member};
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn probe(order_id: i32, order_type_id: i32) -> Option<OrderProbe> {
        Some(OrderProbe {
            order_id,
            order_type_id: Some(order_type_id),
            concept_id: Some(500),
            encounter_id: Some(77),
        })
    }

    fn panel_rows() -> Vec<ExpansionRow> {
        let base = enriched_row(9000, concept(500, true));
        [(9001, 501), (9001, 501), (9001, 501), (9002, 502)]
            .into_iter()
            .map(|(order_id, concept_id)| ExpansionRow {
                base: base.clone(),
                set_member: set_member(order_id, concept_id),
                ..Default::default()
            })
            .collect()
    }

    fn engine(store: &FakeOrderStore) -> OrderEnrichment<'_, FakeOrderStore> {
        OrderEnrichment::new(store, ExpansionPolicy::default())
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found_after_probe_only() {
        let store = FakeOrderStore::default();
        let err = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(1))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Order not found: order_id=1");
        assert_eq!(store.calls(), vec![Query::Probe]);
    }

    #[tokio::test]
    async fn test_panel_expansion() {
        let store = FakeOrderStore {
            probe: probe(9000, 3),
            expansion: panel_rows(),
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9000))
            .await
            .unwrap();

        assert_json_include!(
            actual: serde_json::to_value(&expanded).unwrap(),
            expected: json!({
                "order": { "order_id": 9000, "concept_info": { "concept_id": 500, "is_set": true } },
                "set_members": [ { "order_id": 9001 }, { "order_id": 9002 } ],
                "parent_concept": null
            })
        );
        assert_eq!(store.calls(), vec![Query::Probe, Query::Expansion]);
    }

    #[tokio::test]
    async fn test_parent_expansion() {
        let store = FakeOrderStore {
            probe: probe(9100, 3),
            expansion: vec![ExpansionRow {
                base: enriched_row(9100, concept(700, false)),
                parent: concept(650, true),
                ..Default::default()
            }],
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9100))
            .await
            .unwrap();

        assert_eq!(expanded.parent_concept.unwrap().concept_id, 650);
        assert!(expanded.set_members.is_none());
    }

    #[tokio::test]
    async fn test_empty_expansion_routes_through_fallback() {
        let store = FakeOrderStore {
            probe: probe(9000, 3),
            fallback: Some(enriched_row(9000, concept(500, true))),
            panel_members: vec![set_member(9001, 501)],
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9000))
            .await
            .unwrap();

        assert_eq!(expanded.order.order_id, 9000);
        assert_eq!(expanded.set_members.unwrap().len(), 1);
        assert_eq!(
            store.calls(),
            vec![
                Query::Probe,
                Query::Expansion,
                Query::FallbackOrder(9000),
                Query::PanelMembers(500, 77),
            ]
        );
    }

    #[tokio::test]
    async fn test_disabled_fallback_is_an_internal_error() {
        let store = FakeOrderStore {
            probe: probe(9000, 3),
            fallback: Some(enriched_row(9000, concept(500, true))),
            ..Default::default()
        };
        let engine = OrderEnrichment::new(&store, ExpansionPolicy::default().with_fallback(false));

        let err = engine
            .get_single_order_with_expansion(OrderSelector::Id(9000))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Internal { .. }));
        assert_eq!(store.calls(), vec![Query::Probe, Query::Expansion]);
    }

    #[tokio::test]
    async fn test_drug_order_gets_prescription_details() {
        let base = enriched_row(9500, concept(900, false));
        let store = FakeOrderStore {
            probe: probe(9500, 2),
            expansion: vec![ExpansionRow {
                base: base.clone(),
                ..Default::default()
            }],
            drug: vec![DrugOrderRow {
                base,
                drug: DrugColumns {
                    drug_order_id: Some(9500),
                    drug_id: Some(11),
                    drug_name: Some("Amoxicillin 500mg".into()),
                    frequency_name: Some("Three times daily".into()),
                    ..Default::default()
                },
            }],
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9500))
            .await
            .unwrap();

        let drug = expanded.order.drug_order_info.unwrap();
        assert_eq!(drug.drug_id, Some(11));
        assert_eq!(drug.frequency_name.as_deref(), Some("Three times daily"));
        assert_eq!(
            store.calls(),
            vec![Query::Probe, Query::Expansion, Query::Drug]
        );
    }

    #[tokio::test]
    async fn test_drug_order_outside_a_visit_reads_details_directly() {
        let base = enriched_row(9600, concept(900, false));
        let store = FakeOrderStore {
            probe: probe(9600, 2),
            fallback: Some(base.clone()),
            fallback_drug: Some(DrugOrderRow {
                base,
                drug: DrugColumns {
                    drug_order_id: Some(9600),
                    drug_name: Some("Ibuprofen 200mg tablet".into()),
                    ..Default::default()
                },
            }),
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9600))
            .await
            .unwrap();

        let drug = expanded.order.drug_order_info.unwrap();
        assert_eq!(drug.drug_name.as_deref(), Some("Ibuprofen 200mg tablet"));
        assert_eq!(
            store.calls(),
            vec![
                Query::Probe,
                Query::Expansion,
                Query::FallbackOrder(9600),
                Query::FallbackDrug(9600),
            ]
        );
    }

    #[tokio::test]
    async fn test_drug_order_without_details_keeps_the_order() {
        let store = FakeOrderStore {
            probe: probe(9600, 2),
            fallback: Some(enriched_row(9600, concept(900, false))),
            ..Default::default()
        };

        let expanded = engine(&store)
            .get_single_order_with_expansion(OrderSelector::Id(9600))
            .await
            .unwrap();

        assert_eq!(expanded.order.order_id, 9600);
        assert!(expanded.order.drug_order_info.is_none());
        assert!(!store.calls().contains(&Query::Drug));
    }

    #[tokio::test]
    async fn test_get_enriched_order() {
        let store = FakeOrderStore {
            enriched: vec![enriched_row(42, concept(500, true))],
            ..Default::default()
        };
        let order = engine(&store).get_enriched_order(42).await.unwrap();
        assert_eq!(order.order_id, 42);

        let store = FakeOrderStore::default();
        let err = engine(&store).get_enriched_order(42).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_expanded_orders_folds_per_order() {
        let mut rows = panel_rows();
        rows.push(ExpansionRow {
            base: enriched_row(9100, concept(700, false)),
            ..Default::default()
        });
        let store = FakeOrderStore {
            expansion: rows,
            ..Default::default()
        };

        let orders = engine(&store)
            .list_expanded_orders(&OrderFilter::new().patient_id(85), Page::default())
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].set_members.as_ref().unwrap().len(), 2);
        assert!(orders[1].set_members.is_none());
    }

    #[tokio::test]
    async fn test_list_drug_orders() {
        let store = FakeOrderStore {
            drug: vec![DrugOrderRow {
                base: enriched_row(9500, concept(900, false)),
                drug: DrugColumns {
                    drug_order_id: Some(9500),
                    ..Default::default()
                },
            }],
            ..Default::default()
        };

        let orders = engine(&store)
            .list_drug_orders(&OrderFilter::new(), Page::default())
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].drug_order_info.is_some());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = FakeOrderStore {
            fail_with: Some("connection reset by peer".into()),
            ..Default::default()
        };
        let err = engine(&store)
            .list_enriched_orders(&OrderFilter::new(), Page::default())
            .await
            .unwrap_err();
        assert!(err.is_query_failed());
        assert_eq!(err.to_string(), "Query failed: connection reset by peer");
    }
}
