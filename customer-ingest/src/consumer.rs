use std::time::Duration;

use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message,
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::codec::{self, CodecError};
use crate::config::{ConsumerConfig, KafkaConfig};
use crate::metrics_consts::RECORDS_CONSUMED;
use crate::store::{CustomerStore, StoreError};
use crate::types::CustomerRecord;

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error(transparent)]
    MalformedRecord(#[from] CodecError),
    #[error("no messages consumed within {waited:?}")]
    NoMessagesConsumed { waited: Duration },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Consumes one topic of Avro-encoded customer records.
///
/// Each instance owns its subscription: connection state is explicit
/// configuration passed in at construction, and dropping the consumer closes
/// the underlying connection on every exit path.
pub struct CustomerConsumer {
    consumer: StreamConsumer,
    topic: String,
    poll_interval: Duration,
    poll_budget: Duration,
    max_batch_size: usize,
}

impl CustomerConsumer {
    pub fn new(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("group.id", &consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                &consumer_config.kafka_consumer_offset_reset,
            );

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        Ok(Self {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
            poll_interval: Duration::from_millis(consumer_config.kafka_poll_interval_ms),
            poll_budget: Duration::from_millis(consumer_config.kafka_poll_budget_ms),
            max_batch_size: consumer_config.kafka_max_batch_size,
        })
    }

    /// Gather whatever arrives within one poll interval, up to the batch cap.
    /// A null payload is kept as empty bytes and rejected at decode time.
    async fn gather(&self) -> Result<Vec<Vec<u8>>, KafkaError> {
        let mut payloads = Vec::new();
        let mut failure = None;

        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => {},
            _ = async {
                while payloads.len() < self.max_batch_size {
                    match self.consumer.recv().await {
                        Ok(message) => {
                            payloads.push(message.payload().unwrap_or_default().to_vec());
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            } => {}
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(payloads),
        }
    }

    /// Wait for the first non-empty batch and decode it in full.
    ///
    /// This is deliberately not continuous draining: once one non-empty poll
    /// round succeeds the consumer stops, and later messages are left for the
    /// next invocation. Zero messages within the total budget fails with
    /// `NoMessagesConsumed`.
    pub async fn next_batch(&self) -> Result<Vec<CustomerRecord>, ConsumeError> {
        let started = Instant::now();
        loop {
            let payloads = self.gather().await?;
            if !payloads.is_empty() {
                let mut records = Vec::with_capacity(payloads.len());
                for payload in &payloads {
                    records.push(codec::decode(payload)?);
                }
                return Ok(records);
            }
            if started.elapsed() >= self.poll_budget {
                warn!(
                    topic = %self.topic,
                    "no messages received within the poll budget"
                );
                return Err(ConsumeError::NoMessagesConsumed {
                    waited: started.elapsed(),
                });
            }
        }
    }

    /// Consume the next batch and persist every record.
    ///
    /// Persist-none-on-failure: the whole batch is decoded before the first
    /// insert, so a malformed message aborts with zero rows written. Duplicate
    /// keys during persistence propagate as typed errors.
    pub async fn consume_and_persist(&self, store: &CustomerStore) -> Result<usize, ConsumeError> {
        let records = self.next_batch().await?;
        for record in &records {
            store.insert_raw(record).await?;
        }
        metrics::counter!(RECORDS_CONSUMED).increment(records.len() as u64);
        info!(
            topic = %self.topic,
            count = records.len(),
            "persisted customer batch"
        );
        Ok(records.len())
    }
}
