//! Order filtering for the OMRS bridge.
//!
//! [`OrderFilter`] holds constraints over a closed set of [`FilterKey`]s;
//! [`build_where_clause`] turns them into named-parameter predicates and
//! [`compile_named`] splices those into a template with positional binds.

pub mod filter;
pub mod sql_builder;

pub use filter::{FilterKey, OrderFilter, ValueKind, build_where_clause};
pub use sql_builder::{
    BuiltQuery, MATCH_ALL, NamedParam, SqlBuilderError, SqlValue, WHERE_CLAUSE_SLOT, WhereClause,
    compile_named, validate_param_name,
};
