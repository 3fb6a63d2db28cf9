use customer_ingest::{
    app_context::AppContext, config::Config, enrichment::EnrichmentJob, error::UnhandledError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> Result<(), UnhandledError> {
    setup_tracing();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        return Ok(());
    };

    let config = Config::init_with_defaults()?;
    let context = AppContext::new(&config).await?;

    match command.as_str() {
        "consume" => {
            let count = context.consumer.consume_and_persist(&context.store).await?;
            println!("Consumed records: {count}");
        }
        "enrich" => {
            let count = EnrichmentJob::new(context.store.clone()).run().await?;
            println!("Enriched records: {count}");
        }
        "lookup" => {
            let Some(customer_id) = args.next() else {
                eprintln!("usage: customer-ingest lookup <customer-id>");
                std::process::exit(2);
            };
            let response = context.status_client.lookup(&customer_id).await?;
            println!(
                "Customer {} status: {} (source: {})",
                response.customer_id, response.status, response.source
            );
        }
        other => {
            eprintln!("unknown command: {other}");
            std::process::exit(1);
        }
    }

    Ok(())
}
