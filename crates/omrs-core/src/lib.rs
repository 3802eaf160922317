pub mod id;
pub mod model;
pub mod names;

pub use id::{IdError, validate_uuid};
pub use model::{
    ConceptAnswerSummary, ConceptClassSummary, ConceptDatatypeSummary, ConceptNameLocale,
    ConceptSummary, DrugOrderDetail, ExpandedOrder, OrderRecord, OrdererSummary,
    ParentConceptMetadata, PersonSummary, SetMemberOrder,
};
pub use names::{NameParts, assemble_name};
