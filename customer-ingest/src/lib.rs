pub mod app_context;
pub mod codec;
pub mod config;
pub mod consumer;
pub mod enrichment;
pub mod error;
pub mod metrics_consts;
pub mod status;
pub mod store;
pub mod types;
