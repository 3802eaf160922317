//! # omrs-storage
//!
//! The order enrichment engine.
//!
//! A store implements [`OrderStore`] and hands back typed rows following the
//! contract in [`rows`]. [`OrderEnrichment`] drives the store and folds the
//! rows into nested [`omrs_core::OrderRecord`] and [`omrs_core::ExpandedOrder`]
//! values. The engine itself never sees SQL.
//!
//! ## Example
//!
//! ```ignore
//! use omrs_storage::{ExpansionPolicy, OrderEnrichment, OrderSelector};
//!
//! async fn show(store: &impl OrderStore) -> Result<(), StorageError> {
//!     let engine = OrderEnrichment::new(store, ExpansionPolicy::default());
//!     let selector = OrderSelector::from_parts(Some(9001), None)?;
//!     let expanded = engine.get_single_order_with_expansion(selector).await?;
//!     println!("{:?}", expanded.set_members);
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod fallback;
mod fold;
mod resolve;
pub mod rows;
mod traits;
mod types;

#[cfg(test)]
mod testing;

pub use engine::OrderEnrichment;
pub use error::StorageError;
pub use fallback::FallbackExpander;
pub use fold::{Expansion, RowFolder};
pub use resolve::{
    resolve_answer, resolve_concept, resolve_drug, resolve_order, resolve_orderer,
    resolve_person, resolve_set_member,
};
pub use rows::{
    AnswerColumns, ClassColumns, ColumnRole, ConceptColumns, DatatypeColumns, DrugColumns,
    DrugOrderRow, EnrichedOrderRow, ExpansionRow, OrderColumns, OrderProbe, PersonColumns,
    ProviderColumns, SetMemberColumns,
};
pub use traits::OrderStore;
pub use types::{
    DEFAULT_LIMIT, EnrichmentOptions, ExpansionPolicy, MAX_LIMIT, OrderSelector, Page,
};
