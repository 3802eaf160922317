//! Binds a filter and pagination into a template and runs it.

use omrs_search::{NamedParam, SqlValue, WhereClause, compile_named};
use omrs_storage::{Page, StorageError};
use sqlx_core::executor::Executor;
use sqlx_core::query::Query;
use sqlx_postgres::{PgArguments, PgRow, Postgres};
use tracing::{debug, warn};

use crate::error::storage_error;

/// Helper trait to bind compiled parameters in position order.
trait BindAllParams<'q> {
    fn bind_all_params(self, params: &'q [SqlValue]) -> Self;
}

impl<'q> BindAllParams<'q> for Query<'q, Postgres, PgArguments> {
    fn bind_all_params(mut self, params: &'q [SqlValue]) -> Self {
        for param in params {
            self = match param {
                SqlValue::Text(s) => self.bind(s.as_str()),
                SqlValue::Integer(i) => self.bind(*i),
                SqlValue::Boolean(b) => self.bind(*b),
                SqlValue::Timestamp(ts) => self.bind(*ts),
            };
        }
        self
    }
}

/// Parameters every concept-resolving template needs.
pub(crate) fn locale_param(locale: &str) -> NamedParam {
    ("locale".to_string(), SqlValue::Text(locale.to_string()))
}

pub(crate) fn page_params(page: Page) -> [NamedParam; 2] {
    [
        ("limit".to_string(), SqlValue::Integer(i64::from(page.limit))),
        ("skip".to_string(), SqlValue::Integer(i64::from(page.skip))),
    ]
}

/// Executes one read statement and returns its raw rows.
///
/// Store errors are propagated as they are, without retry.
pub(crate) async fn fetch_rows<'e, E>(
    executor: E,
    template: &str,
    where_clause: &WhereClause,
    extra: &[NamedParam],
) -> Result<Vec<PgRow>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let built = compile_named(template, where_clause, extra)?;
    debug!(
        predicates = where_clause.predicates().len(),
        params = built.params.len(),
        sql = %built.sql,
        "executing enrichment query"
    );

    sqlx_core::query::query::<Postgres>(&built.sql)
        .bind_all_params(&built.params)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            warn!(error = %e, "enrichment query failed");
            storage_error(e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params() {
        let [limit, skip] = page_params(Page { skip: 20, limit: 10 });
        assert_eq!(limit, ("limit".to_string(), SqlValue::Integer(10)));
        assert_eq!(skip, ("skip".to_string(), SqlValue::Integer(20)));
    }

    #[test]
    fn test_locale_param() {
        assert_eq!(
            locale_param("fr"),
            ("locale".to_string(), SqlValue::Text("fr".into()))
        );
    }
}
