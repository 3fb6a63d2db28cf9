use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::consumer::CustomerConsumer;
use crate::error::UnhandledError;
use crate::status::StatusLookupClient;
use crate::store::CustomerStore;

pub struct AppContext {
    pub store: CustomerStore,
    pub consumer: CustomerConsumer,
    pub status_client: StatusLookupClient,
    pub config: Config,
}

impl AppContext {
    pub async fn new(config: &Config) -> Result<Self, UnhandledError> {
        let store = CustomerStore::connect(&config.database_url, config.max_pg_connections).await?;
        let consumer = CustomerConsumer::new(config.kafka.clone(), config.consumer.clone())?;
        let status_client = StatusLookupClient::new(
            store.clone(),
            config.status_endpoint.clone(),
            Duration::from_secs(config.status_request_timeout_seconds),
        );

        info!(
            "AppContext initialized, subscribed to topic {}",
            config.consumer.kafka_consumer_topic
        );

        Ok(Self {
            store,
            consumer,
            status_client,
            config: config.clone(),
        })
    }
}
