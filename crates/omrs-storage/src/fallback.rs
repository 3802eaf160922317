//! Degraded reconstruction of an expanded order.
//!
//! Used only when the expansion read returns no rows for an order the
//! existence probe has just seen. The order is re-read through a minimal
//! single-row join. If its concept is a panel, members are read straight
//! from the membership table. The parent-concept slot is never rebuilt on
//! this path and stays `None`.

use omrs_core::ExpandedOrder;
use tracing::{instrument, warn};

use crate::error::StorageError;
use crate::fold::{Expansion, collect_set_members};
use crate::resolve::resolve_order;
use crate::rows::OrderProbe;
use crate::traits::OrderStore;

pub struct FallbackExpander<'a, S: OrderStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: OrderStore + ?Sized> FallbackExpander<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(order_id = probe.order_id))]
    pub async fn expand(&self, probe: &OrderProbe) -> Result<ExpandedOrder, StorageError> {
        // The order can disappear between the probe and this read.
        let row = self
            .store
            .fallback_order_row(probe.order_id)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("order_id={}", probe.order_id)))?;

        let order = resolve_order(&row);

        let expansion = match (order.concept_info.as_ref(), order.encounter_id) {
            (Some(concept), Some(encounter_id)) if concept.is_set => {
                let members = self
                    .store
                    .panel_member_rows(concept.concept_id, encounter_id)
                    .await?;
                Expansion::from_members(collect_set_members(&members))
            }
            (Some(concept), _) if !concept.is_set => {
                warn!(
                    concept_id = concept.concept_id,
                    "parent concept is not reconstructed on the fallback path"
                );
                Expansion::None
            }
            _ => Expansion::None,
        };

        let (set_members, parent_concept) = expansion.into_slots();
        Ok(ExpandedOrder {
            order,
            set_members,
            parent_concept,
        })
    }
}
