//! PostgreSQL implementations of [`OrderStore`].

use async_trait::async_trait;
use omrs_search::OrderFilter;
use omrs_storage::{
    DrugOrderRow, EnrichedOrderRow, EnrichmentOptions, ExpansionRow, OrderEnrichment, OrderProbe,
    OrderSelector, OrderStore, Page, SetMemberColumns, StorageError,
};
use sqlx_postgres::{PgPool, PgTransaction, Postgres};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result, storage_error};
use crate::pool::create_pool;
use crate::queries;

/// Pool-backed order store.
///
/// Each read checks out its own connection. Use [`session`](Self::session)
/// to run all reads of a request inside one read-only transaction.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    options: EnrichmentOptions,
}

impl PostgresOrderStore {
    /// Creates a store with a fresh connection pool.
    pub async fn new(config: &PostgresConfig, options: EnrichmentOptions) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::from_pool(pool, options))
    }

    /// Creates a store over an existing pool.
    pub fn from_pool(pool: PgPool, options: EnrichmentOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn options(&self) -> &EnrichmentOptions {
        &self.options
    }

    /// The enrichment engine over this store.
    pub fn enrichment(&self) -> OrderEnrichment<'_, Self> {
        OrderEnrichment::new(self, self.options.policy())
    }

    /// Opens a read-only transaction on one pooled connection.
    #[instrument(skip(self))]
    pub async fn session(&self) -> std::result::Result<PostgresOrderSession, StorageError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        sqlx_core::query::query::<Postgres>("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        debug!("read session opened");
        Ok(PostgresOrderSession::new(tx, self.options.clone()))
    }

    /// Closes the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn probe_order(
        &self,
        selector: &OrderSelector,
    ) -> std::result::Result<Option<OrderProbe>, StorageError> {
        queries::probe_order(&self.pool, selector).await
    }

    async fn enriched_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<EnrichedOrderRow>, StorageError> {
        queries::enriched_rows(&self.pool, &self.options.locale, filter, page).await
    }

    async fn expansion_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<ExpansionRow>, StorageError> {
        queries::expansion_rows(&self.pool, &self.options.locale, filter, page).await
    }

    async fn drug_order_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<DrugOrderRow>, StorageError> {
        queries::drug_order_rows(&self.pool, &self.options.locale, filter, page).await
    }

    async fn fallback_order_row(
        &self,
        order_id: i32,
    ) -> std::result::Result<Option<EnrichedOrderRow>, StorageError> {
        queries::fallback_order_row(&self.pool, &self.options.locale, order_id).await
    }

    async fn fallback_drug_row(
        &self,
        order_id: i32,
    ) -> std::result::Result<Option<DrugOrderRow>, StorageError> {
        queries::fallback_drug_row(&self.pool, &self.options.locale, order_id).await
    }

    async fn panel_member_rows(
        &self,
        panel_concept_id: i32,
        encounter_id: i32,
    ) -> std::result::Result<Vec<SetMemberColumns>, StorageError> {
        queries::panel_member_rows(&self.pool, &self.options.locale, panel_concept_id, encounter_id)
            .await
    }
}

/// One request's read scope: a read-only transaction on a single
/// connection.
///
/// sqlx needs mutable access to the transaction even for reads, so it sits
/// behind a mutex. Reads are serialised through it in call order. The
/// transaction rolls back on drop if [`finish`](Self::finish) is never
/// called, which is harmless for a read-only scope.
pub struct PostgresOrderSession {
    tx: Mutex<Option<Box<PgTransaction<'static>>>>,
    options: EnrichmentOptions,
}

fn session_closed() -> StorageError {
    PostgresError::session("already finished").into()
}

impl PostgresOrderSession {
    pub fn new(tx: PgTransaction<'static>, options: EnrichmentOptions) -> Self {
        Self {
            tx: Mutex::new(Some(Box::new(tx))),
            options,
        }
    }

    /// The enrichment engine over this session.
    pub fn enrichment(&self) -> OrderEnrichment<'_, Self> {
        OrderEnrichment::new(self, self.options.policy())
    }

    /// Ends the read scope.
    pub async fn finish(self) -> std::result::Result<(), StorageError> {
        if let Some(tx) = self.tx.lock().await.take() {
            tx.commit().await.map_err(storage_error)?;
            debug!("read session finished");
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderSession {
    async fn probe_order(
        &self,
        selector: &OrderSelector,
    ) -> std::result::Result<Option<OrderProbe>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::probe_order(&mut **tx, selector).await
    }

    async fn enriched_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<EnrichedOrderRow>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::enriched_rows(&mut **tx, &self.options.locale, filter, page).await
    }

    async fn expansion_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<ExpansionRow>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::expansion_rows(&mut **tx, &self.options.locale, filter, page).await
    }

    async fn drug_order_rows(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> std::result::Result<Vec<DrugOrderRow>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::drug_order_rows(&mut **tx, &self.options.locale, filter, page).await
    }

    async fn fallback_order_row(
        &self,
        order_id: i32,
    ) -> std::result::Result<Option<EnrichedOrderRow>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::fallback_order_row(&mut **tx, &self.options.locale, order_id).await
    }

    async fn fallback_drug_row(
        &self,
        order_id: i32,
    ) -> std::result::Result<Option<DrugOrderRow>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::fallback_drug_row(&mut **tx, &self.options.locale, order_id).await
    }

    async fn panel_member_rows(
        &self,
        panel_concept_id: i32,
        encounter_id: i32,
    ) -> std::result::Result<Vec<SetMemberColumns>, StorageError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_deref_mut().ok_or_else(session_closed)?;
        queries::panel_member_rows(&mut **tx, &self.options.locale, panel_concept_id, encounter_id)
            .await
    }
}
