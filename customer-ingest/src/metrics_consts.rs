pub const RECORDS_CONSUMED: &str = "customer_records_consumed";
pub const ROWS_ENRICHED: &str = "customer_rows_enriched";
pub const STATUS_LOOKUPS: &str = "customer_status_lookups";
