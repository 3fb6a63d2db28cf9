use serde::{Deserialize, Serialize};

/// A customer as ingested from the stream, prior to any enrichment.
/// Immutable once persisted; `customer_id` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrichedCustomer {
    pub customer_id: String,
    pub enriched_name: String,
}

/// The outcome of one external status lookup. At most one row per customer;
/// `raw_response` keeps the full body for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusResponse {
    pub customer_id: String,
    pub status: String,
    pub source: String,
    pub raw_response: String,
}
