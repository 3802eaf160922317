//! Row folding: flat, repeating join rows back into nested orders.
//!
//! One order spans several expansion rows because the answer and set-member
//! joins multiply out. Everything order-level (scalars, people, concept,
//! parent columns) is identical across those rows and is read from the
//! first one. Set members and answers are collected across all rows and
//! deduplicated by id in first-seen order.

use std::collections::HashSet;

use indexmap::IndexMap;
use omrs_core::{
    ConceptAnswerSummary, ExpandedOrder, OrderRecord, ParentConceptMetadata, SetMemberOrder,
};

use crate::resolve::{resolve_answer, resolve_concept, resolve_drug, resolve_order, resolve_set_member};
use crate::rows::{DrugOrderRow, EnrichedOrderRow, ExpansionRow, SetMemberColumns};

/// Which expansion an order gets, decided once from its concept.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// The concept is a panel. Never holds an empty list.
    SetMembers(Vec<SetMemberOrder>),
    /// The concept belongs to this panel.
    Parent(ParentConceptMetadata),
    /// Unresolvable concept, a panel without members, or a concept that
    /// belongs to no panel.
    None,
}

impl Expansion {
    /// Splits into the `(set_members, parent_concept)` output slots.
    pub fn into_slots(self) -> (Option<Vec<SetMemberOrder>>, Option<ParentConceptMetadata>) {
        match self {
            Self::SetMembers(members) => (Some(members), None),
            Self::Parent(parent) => (None, Some(parent)),
            Self::None => (None, None),
        }
    }

    /// Wraps collected members; an empty list means no expansion.
    pub fn from_members(members: Vec<SetMemberOrder>) -> Self {
        if members.is_empty() {
            Self::None
        } else {
            Self::SetMembers(members)
        }
    }
}

pub struct RowFolder;

impl RowFolder {
    /// Folds one base-template row.
    pub fn fold_enriched(row: &EnrichedOrderRow) -> OrderRecord {
        resolve_order(row)
    }

    /// Folds one drug-template row, attaching prescription details.
    pub fn fold_drug(row: &DrugOrderRow) -> OrderRecord {
        OrderRecord {
            drug_order_info: resolve_drug(&row.drug),
            ..resolve_order(&row.base)
        }
    }

    /// Folds the expansion rows of a single order.
    ///
    /// Rows belonging to another order than the first are ignored. Returns
    /// `None` for an empty row set.
    pub fn fold_expansion(rows: &[ExpansionRow]) -> Option<ExpandedOrder> {
        let first = rows.first()?;
        let order_id = first.order_id();
        let rows: Vec<&ExpansionRow> = rows.iter().filter(|r| r.order_id() == order_id).collect();
        Some(fold_order(&rows))
    }

    /// Folds the expansion rows of many orders, one result per distinct order
    /// id in first-seen order.
    pub fn fold_expansion_pages(rows: &[ExpansionRow]) -> Vec<ExpandedOrder> {
        let mut grouped: IndexMap<i32, Vec<&ExpansionRow>> = IndexMap::new();
        for row in rows {
            grouped.entry(row.order_id()).or_default().push(row);
        }
        grouped.values().map(|group| fold_order(group)).collect()
    }
}

/// `rows` is never empty: callers group rows by order id first.
fn fold_order(rows: &[&ExpansionRow]) -> ExpandedOrder {
    let first = rows[0];
    let mut order = resolve_order(&first.base);

    if let Some(concept) = order.concept_info.as_mut() {
        concept.answers = collect_answers(rows);
    }

    let expansion = match order.concept_info.as_ref() {
        None => Expansion::None,
        Some(concept) if concept.is_set => {
            Expansion::from_members(collect_set_members(rows.iter().map(|r| &r.set_member)))
        }
        Some(_) => resolve_concept(&first.parent).map_or(Expansion::None, Expansion::Parent),
    };

    let (set_members, parent_concept) = expansion.into_slots();
    ExpandedOrder {
        order,
        set_members,
        parent_concept,
    }
}

/// Resolves set members, keeping the first occurrence of each order id.
pub(crate) fn collect_set_members<'a, I>(members: I) -> Vec<SetMemberOrder>
where
    I: IntoIterator<Item = &'a SetMemberColumns>,
{
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|cols| cols.order_id.is_some_and(|id| seen.insert(id)))
        .filter_map(resolve_set_member)
        .collect()
}

fn collect_answers(rows: &[&ExpansionRow]) -> Option<Vec<ConceptAnswerSummary>> {
    let mut seen = HashSet::new();
    let answers: Vec<_> = rows
        .iter()
        .filter_map(|r| resolve_answer(&r.answer))
        .filter(|a| seen.insert(a.concept_id))
        .collect();

    if answers.is_empty() { None } else { Some(answers) }
}
