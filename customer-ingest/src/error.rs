use thiserror::Error;

use crate::consumer::ConsumeError;
use crate::status::LookupError;
use crate::store::StoreError;

/// Top-level failures surfaced by the entry point. Everything below this is a
/// typed per-module error; nothing is retried internally beyond the
/// consumer's own bounded re-polling.
#[derive(Debug, Error)]
pub enum UnhandledError {
    #[error("config error: {0}")]
    Config(#[from] envconfig::Error),
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Consume(#[from] ConsumeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
