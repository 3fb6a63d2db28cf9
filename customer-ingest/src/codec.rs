use apache_avro::{
    from_avro_datum, to_avro_datum,
    types::{Record, Value},
    Schema,
};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::types::CustomerRecord;

/// The one schema customers are produced under. Single-datum binary encoding,
/// no object-container framing, matching the upstream producer.
pub const CUSTOMER_SCHEMA_JSON: &str = r#"
{
    "type": "record",
    "name": "Customer",
    "namespace": "com.bank",
    "fields": [
        { "name": "customerId", "type": "string" },
        { "name": "name", "type": "string" }
    ]
}
"#;

static CUSTOMER_SCHEMA: Lazy<Schema> =
    Lazy::new(|| Schema::parse_str(CUSTOMER_SCHEMA_JSON).expect("customer schema is valid"));

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed customer record ({input_len} bytes): {reason}")]
    MalformedRecord { input_len: usize, reason: String },
}

fn malformed(input_len: usize, reason: impl Into<String>) -> CodecError {
    CodecError::MalformedRecord {
        input_len,
        reason: reason.into(),
    }
}

/// Encode a customer record as an Avro binary datum. Both fields are mandatory
/// strings, so a well-formed record cannot fail to serialize.
pub fn encode(record: &CustomerRecord) -> Vec<u8> {
    let mut datum = Record::new(&CUSTOMER_SCHEMA).expect("customer schema is a record schema");
    datum.put("customerId", record.customer_id.as_str());
    datum.put("name", record.name.as_str());
    to_avro_datum(&CUSTOMER_SCHEMA, datum).expect("string fields always serialize")
}

/// Decode an Avro binary datum into a customer record.
///
/// Truncated input, non-string fields, and trailing bytes after the datum are
/// all malformed; a partially-populated record is never returned.
pub fn decode(bytes: &[u8]) -> Result<CustomerRecord, CodecError> {
    let mut reader = bytes;
    let value = from_avro_datum(&CUSTOMER_SCHEMA, &mut reader, None)
        .map_err(|e| malformed(bytes.len(), e.to_string()))?;
    if !reader.is_empty() {
        return Err(malformed(
            bytes.len(),
            format!("{} trailing bytes after datum", reader.len()),
        ));
    }

    let Value::Record(fields) = value else {
        return Err(malformed(bytes.len(), "datum is not a record"));
    };

    let mut customer_id = None;
    let mut name = None;
    for (field, value) in fields {
        match (field.as_str(), value) {
            ("customerId", Value::String(s)) => customer_id = Some(s),
            ("name", Value::String(s)) => name = Some(s),
            (other, _) => {
                return Err(malformed(bytes.len(), format!("unexpected field {other}")))
            }
        }
    }

    match (customer_id, name) {
        (Some(customer_id), Some(name)) => Ok(CustomerRecord { customer_id, name }),
        _ => Err(malformed(bytes.len(), "missing customerId or name")),
    }
}
