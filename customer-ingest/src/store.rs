use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::types::{CustomerRecord, EnrichedCustomer, StatusResponse};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key in {table}: {id}")]
    DuplicateKey { table: &'static str, id: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence over the customer table set. Owns the rows exclusively; no
/// caching beyond a single operation. All operations are single-row atomic.
#[derive(Clone)]
pub struct CustomerStore {
    pool: PgPool,
}

impl CustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Insert a freshly consumed customer. A repeat id is a typed
    /// `DuplicateKey` failure, never silently ignored.
    pub async fn insert_raw(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO customer (customer_id, name) VALUES ($1, $2)")
            .bind(&record.customer_id)
            .bind(&record.name)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "customer", &record.customer_id))?;
        Ok(())
    }

    /// Full snapshot of the raw table; order unspecified.
    pub async fn list_raw(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        let records = sqlx::query_as::<_, CustomerRecord>("SELECT customer_id, name FROM customer")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    pub async fn insert_enriched(&self, record: &EnrichedCustomer) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO customer_enriched (customer_id, enriched_name) VALUES ($1, $2)")
            .bind(&record.customer_id)
            .bind(&record.enriched_name)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "customer_enriched", &record.customer_id))?;
        Ok(())
    }

    /// Insert-or-replace keyed on customer id, last write wins. The only
    /// write with overwrite semantics: lookups are expected to be re-invoked.
    pub async fn upsert_status(&self, response: &StatusResponse) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customer_api_response (customer_id, status, source, raw_response)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id) DO UPDATE SET
                status = EXCLUDED.status,
                source = EXCLUDED.source,
                raw_response = EXCLUDED.raw_response
            "#,
        )
        .bind(&response.customer_id)
        .bind(&response.status)
        .bind(&response.source)
        .bind(&response.raw_response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_raw(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_enriched(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer_enriched")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_enriched(
        &self,
        customer_id: &str,
    ) -> Result<Option<EnrichedCustomer>, StoreError> {
        let row = sqlx::query_as::<_, EnrichedCustomer>(
            "SELECT customer_id, enriched_name FROM customer_enriched WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_status(&self, customer_id: &str) -> Result<Option<StatusResponse>, StoreError> {
        let row = sqlx::query_as::<_, StatusResponse>(
            "SELECT customer_id, status, source, raw_response FROM customer_api_response WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Map SQLSTATE 23505 (unique_violation) to the typed duplicate-key error,
/// keeping the table and offending id for diagnosis.
fn classify(error: sqlx::Error, table: &'static str, id: &str) -> StoreError {
    if error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation())
    {
        return StoreError::DuplicateKey {
            table,
            id: id.to_string(),
        };
    }
    StoreError::Database(error)
}
