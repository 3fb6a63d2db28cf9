use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::metrics_consts::STATUS_LOOKUPS;
use crate::store::{CustomerStore, StoreError};
use crate::types::StatusResponse;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("transport failure calling status endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code {status} looking up customer {customer_id}")]
    UnexpectedStatusCode {
        status: StatusCode,
        customer_id: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn build_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent("Customer Ingest Status Lookup")
        .timeout(request_timeout)
        .build()
}

/// Looks up a customer's status on the external endpoint and merges the
/// response into storage. No connection or decoder state is shared across
/// concurrent invocations; callers wanting parallelism run lookups on
/// independent tasks.
pub struct StatusLookupClient {
    http_client: Client,
    endpoint: String,
    store: CustomerStore,
}

impl StatusLookupClient {
    pub fn new(store: CustomerStore, endpoint: String, request_timeout: Duration) -> Self {
        let http_client = build_http_client(request_timeout)
            .expect("failed to construct reqwest client for status lookups");
        Self {
            http_client,
            endpoint,
            store,
        }
    }

    /// The HTTP half of a lookup: POST the customer id, check the status
    /// code, and leniently parse the body. No persistence.
    pub async fn fetch(&self, customer_id: &str) -> Result<StatusResponse, LookupError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({ "customerId": customer_id }))
            .send()
            .await?;

        let code = response.status();
        if !code.is_success() {
            return Err(LookupError::UnexpectedStatusCode {
                status: code,
                customer_id: customer_id.to_string(),
            });
        }

        let body = response.text().await?;
        let (status, source) = parse_status_fields(&body);
        Ok(StatusResponse {
            customer_id: customer_id.to_string(),
            status,
            source,
            raw_response: body,
        })
    }

    /// Fetch the customer's status and upsert it, keyed on the customer id.
    /// Exactly one upsert per call; re-invocations overwrite the stored row.
    pub async fn lookup(&self, customer_id: &str) -> Result<StatusResponse, LookupError> {
        let response = self.fetch(customer_id).await?;
        self.store.upsert_status(&response).await?;
        metrics::counter!(STATUS_LOOKUPS).increment(1);
        info!(customer_id, status = %response.status, "status lookup persisted");
        Ok(response)
    }
}

/// Lenient parse of `{status, source}` out of the response body. Missing or
/// non-string fields, or a body that is not JSON at all, degrade to empty
/// strings; the caller keeps the raw body regardless.
fn parse_status_fields(body: &str) -> (String, String) {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    (field("status"), field("source"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_fields() {
        let body = r#"{"customerId":"CUST2","status":"ACTIVE","source":"MOCK-API"}"#;
        assert_eq!(
            parse_status_fields(body),
            ("ACTIVE".to_string(), "MOCK-API".to_string())
        );
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        assert_eq!(
            parse_status_fields(r#"{"customerId":"CUST2"}"#),
            (String::new(), String::new())
        );
        assert_eq!(
            parse_status_fields(r#"{"status":"ACTIVE"}"#),
            ("ACTIVE".to_string(), String::new())
        );
    }

    #[test]
    fn non_string_fields_become_empty_strings() {
        assert_eq!(
            parse_status_fields(r#"{"status":42,"source":null}"#),
            (String::new(), String::new())
        );
    }

    #[test]
    fn non_json_body_becomes_empty_strings() {
        assert_eq!(
            parse_status_fields("definitely not json"),
            (String::new(), String::new())
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let body = r#"{"status":"ACTIVE","source":"MOCK-API","extra":{"deep":true}}"#;
        assert_eq!(
            parse_status_fields(body),
            ("ACTIVE".to_string(), "MOCK-API".to_string())
        );
    }
}
