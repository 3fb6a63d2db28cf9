//! Postgres-backed end-to-end tests. These need a database reachable via
//! DATABASE_URL and share the customer tables, so they are ignored by default
//! and meant to run serially:
//!
//!     DATABASE_URL=postgres://... cargo test -- --ignored --test-threads=1

use std::time::Duration;

use customer_ingest::codec;
use customer_ingest::config::{ConsumerConfig, KafkaConfig};
use customer_ingest::consumer::CustomerConsumer;
use customer_ingest::enrichment::EnrichmentJob;
use customer_ingest::status::StatusLookupClient;
use customer_ingest::store::{CustomerStore, StoreError};
use customer_ingest::types::{CustomerRecord, StatusResponse};
use httpmock::prelude::*;
use rdkafka::mocking::MockCluster;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use sqlx::postgres::PgPoolOptions;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customer (customer_id TEXT PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS customer_enriched (customer_id TEXT PRIMARY KEY, enriched_name TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS customer_api_response (customer_id TEXT PRIMARY KEY, status TEXT NOT NULL, source TEXT NOT NULL, raw_response TEXT NOT NULL)",
];

async fn test_store() -> CustomerStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test postgres");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test postgres");
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&pool).await.expect("ddl failed");
    }
    sqlx::query("TRUNCATE customer, customer_enriched, customer_api_response")
        .execute(&pool)
        .await
        .expect("truncate failed");
    CustomerStore::new(pool)
}

fn customer(id: &str, name: &str) -> CustomerRecord {
    CustomerRecord {
        customer_id: id.to_string(),
        name: name.to_string(),
    }
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn consume_then_enrich_end_to_end() {
    let store = test_store().await;

    let cluster = MockCluster::new(1).expect("failed to create mock brokers");
    cluster
        .create_topic("customer-data", 1, 1)
        .expect("failed to create topic");
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", cluster.bootstrap_servers())
        .create()
        .expect("failed to create mock producer");

    let record = customer("CUST1", "john");
    producer
        .send(
            FutureRecord::to("customer-data")
                .key("CUST1")
                .payload(&codec::encode(&record)),
            Duration::from_secs(5),
        )
        .await
        .expect("failed to produce to mock cluster");

    let consumer = CustomerConsumer::new(
        KafkaConfig {
            kafka_hosts: cluster.bootstrap_servers(),
            kafka_tls: false,
        },
        ConsumerConfig {
            kafka_consumer_group: "pipeline-end-to-end".to_string(),
            kafka_consumer_topic: "customer-data".to_string(),
            kafka_consumer_offset_reset: "earliest".to_string(),
            kafka_poll_interval_ms: 200,
            kafka_poll_budget_ms: 10_000,
            kafka_max_batch_size: 10,
        },
    )
    .expect("failed to create consumer");

    let count = consumer.consume_and_persist(&store).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(store.count_raw().await.unwrap(), 1);

    EnrichmentJob::new(store.clone()).run().await.unwrap();
    let enriched = store.get_enriched("CUST1").await.unwrap().unwrap();
    assert_eq!(enriched.enriched_name, "JOHN");
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn enrichment_covers_every_raw_row() {
    let store = test_store().await;
    store.insert_raw(&customer("CUST1", "john")).await.unwrap();
    store.insert_raw(&customer("CUST2", "jane")).await.unwrap();

    let count = EnrichmentJob::new(store.clone()).run().await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(store.count_enriched().await.unwrap(), store.count_raw().await.unwrap());
    let enriched = store.get_enriched("CUST1").await.unwrap().unwrap();
    assert_eq!(enriched.enriched_name, "JOHN");
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn enrichment_rerun_surfaces_duplicate_key() {
    let store = test_store().await;
    store.insert_raw(&customer("CUST1", "john")).await.unwrap();

    let job = EnrichmentJob::new(store.clone());
    job.run().await.unwrap();

    match job.run().await {
        Err(StoreError::DuplicateKey { table, id }) => {
            assert_eq!(table, "customer_enriched");
            assert_eq!(id, "CUST1");
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn duplicate_raw_insert_is_a_typed_failure() {
    let store = test_store().await;
    store.insert_raw(&customer("CUST1", "john")).await.unwrap();

    match store.insert_raw(&customer("CUST1", "john again")).await {
        Err(StoreError::DuplicateKey { table, id }) => {
            assert_eq!(table, "customer");
            assert_eq!(id, "CUST1");
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn upsert_status_is_last_write_wins() {
    let store = test_store().await;
    let first = StatusResponse {
        customer_id: "CUST2".to_string(),
        status: "PENDING".to_string(),
        source: "FIRST".to_string(),
        raw_response: "{}".to_string(),
    };
    let second = StatusResponse {
        status: "ACTIVE".to_string(),
        source: "MOCK-API".to_string(),
        raw_response: r#"{"status":"ACTIVE"}"#.to_string(),
        ..first.clone()
    };

    store.upsert_status(&first).await.unwrap();
    store.upsert_status(&second).await.unwrap();

    let row = store.get_status("CUST2").await.unwrap().unwrap();
    assert_eq!(row, second);
}

#[tokio::test]
#[ignore = "requires postgres via DATABASE_URL"]
async fn lookup_persists_exactly_one_row() {
    let store = test_store().await;
    let server = MockServer::start();
    let body = r#"{"customerId":"CUST2","status":"ACTIVE","source":"MOCK-API"}"#;
    server.mock(|when, then| {
        when.method(POST).path("/customer/status");
        then.status(200).body(body);
    });

    let client = StatusLookupClient::new(
        store.clone(),
        server.url("/customer/status"),
        Duration::from_secs(5),
    );
    client.lookup("CUST2").await.unwrap();

    let row = store.get_status("CUST2").await.unwrap().unwrap();
    assert_eq!(row.status, "ACTIVE");
    assert_eq!(row.source, "MOCK-API");
    assert_eq!(row.raw_response, body);
}
