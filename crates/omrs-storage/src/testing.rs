//! In-memory [`OrderStore`] for engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use omrs_search::OrderFilter;

use crate::error::StorageError;
use crate::rows::{
    ConceptColumns, DrugOrderRow, EnrichedOrderRow, ExpansionRow, OrderColumns, OrderProbe,
    PersonColumns, SetMemberColumns,
};
use crate::traits::OrderStore;
use crate::types::{OrderSelector, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Probe,
    Enriched,
    Expansion,
    Drug,
    FallbackOrder(i32),
    FallbackDrug(i32),
    PanelMembers(i32, i32),
}

/// Returns canned rows regardless of filter and page, recording every call.
#[derive(Default)]
pub struct FakeOrderStore {
    pub probe: Option<OrderProbe>,
    pub enriched: Vec<EnrichedOrderRow>,
    pub expansion: Vec<ExpansionRow>,
    pub drug: Vec<DrugOrderRow>,
    pub fallback: Option<EnrichedOrderRow>,
    pub fallback_drug: Option<DrugOrderRow>,
    pub panel_members: Vec<SetMemberColumns>,
    pub fail_with: Option<String>,
    pub(crate) calls: Mutex<Vec<Query>>,
}

impl FakeOrderStore {
    pub fn calls(&self) -> Vec<Query> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, query: Query) -> Result<(), StorageError> {
        self.calls.lock().unwrap().push(query);
        match &self.fail_with {
            Some(message) => Err(StorageError::query_failed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderStore for FakeOrderStore {
    async fn probe_order(&self, _selector: &OrderSelector) -> Result<Option<OrderProbe>, StorageError> {
        self.record(Query::Probe)?;
        Ok(self.probe)
    }

    async fn enriched_rows(
        &self,
        _filter: &OrderFilter,
        _page: Page,
    ) -> Result<Vec<EnrichedOrderRow>, StorageError> {
        self.record(Query::Enriched)?;
        Ok(self.enriched.clone())
    }

    async fn expansion_rows(
        &self,
        _filter: &OrderFilter,
        _page: Page,
    ) -> Result<Vec<ExpansionRow>, StorageError> {
        self.record(Query::Expansion)?;
        Ok(self.expansion.clone())
    }

    async fn drug_order_rows(
        &self,
        _filter: &OrderFilter,
        _page: Page,
    ) -> Result<Vec<DrugOrderRow>, StorageError> {
        self.record(Query::Drug)?;
        Ok(self.drug.clone())
    }

    async fn fallback_order_row(
        &self,
        order_id: i32,
    ) -> Result<Option<EnrichedOrderRow>, StorageError> {
        self.record(Query::FallbackOrder(order_id))?;
        Ok(self.fallback.clone())
    }

    async fn fallback_drug_row(&self, order_id: i32) -> Result<Option<DrugOrderRow>, StorageError> {
        self.record(Query::FallbackDrug(order_id))?;
        Ok(self.fallback_drug.clone())
    }

    async fn panel_member_rows(
        &self,
        panel_concept_id: i32,
        encounter_id: i32,
    ) -> Result<Vec<SetMemberColumns>, StorageError> {
        self.record(Query::PanelMembers(panel_concept_id, encounter_id))?;
        Ok(self.panel_members.clone())
    }
}

pub fn concept(id: i32, is_set: bool) -> ConceptColumns {
    ConceptColumns {
        concept_id: Some(id),
        uuid: Some(format!("concept-{id}")),
        is_set: Some(is_set),
        name: Some(format!("Concept {id}")),
        ..Default::default()
    }
}

/// An order in encounter 77 for patient 85.
pub fn enriched_row(order_id: i32, concept_cols: ConceptColumns) -> EnrichedOrderRow {
    EnrichedOrderRow {
        order: OrderColumns {
            order_id,
            uuid: format!("order-{order_id}"),
            concept_id: concept_cols.concept_id,
            encounter_id: Some(77),
            patient_id: Some(85),
            ..Default::default()
        },
        patient: PersonColumns {
            person_id: Some(85),
            ..Default::default()
        },
        concept: concept_cols,
        ..Default::default()
    }
}

pub fn set_member(order_id: i32, concept_id: i32) -> SetMemberColumns {
    SetMemberColumns {
        order_id: Some(order_id),
        uuid: Some(format!("order-{order_id}")),
        concept: concept(concept_id, false),
        ..Default::default()
    }
}
