use tracing::info;

use crate::metrics_consts::ROWS_ENRICHED;
use crate::store::{CustomerStore, StoreError};
use crate::types::EnrichedCustomer;

/// The enrichment transform. Pure and deterministic; applying it twice is the
/// same as applying it once.
pub fn enrich_name(name: &str) -> String {
    name.to_uppercase()
}

/// Transforms every currently-stored raw customer into an enriched row.
///
/// Full-table batch pass, not incremental: re-running against an unchanged
/// raw set re-inserts existing keys and surfaces `DuplicateKey` on the first
/// conflict. Callers wanting an idempotent re-run clear the enriched table
/// first.
pub struct EnrichmentJob {
    store: CustomerStore,
}

impl EnrichmentJob {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }

    /// Returns the count of records processed.
    pub async fn run(&self) -> Result<usize, StoreError> {
        let customers = self.store.list_raw().await?;
        for customer in &customers {
            let enriched = EnrichedCustomer {
                customer_id: customer.customer_id.clone(),
                enriched_name: enrich_name(&customer.name),
            };
            self.store.insert_enriched(&enriched).await?;
        }
        metrics::counter!(ROWS_ENRICHED).increment(customers.len() as u64);
        info!(count = customers.len(), "enrichment pass complete");
        Ok(customers.len())
    }
}
