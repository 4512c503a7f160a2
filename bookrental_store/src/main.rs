use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer};
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookrental_store::app_config::config_app;
use bookrental_store::document_store::{DocumentStore, InMemoryDocumentStore};

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() {
    let app_name = "bookrental_store";

    // Start a new Jaeger trace pipeline.
    // Spans are exported in batch - recommended setup for a production application.
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer using the Jaeger tracer
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    // Combined them all together in a `tracing` subscriber
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);

    // json-server style seed file: {"books": [...], "users": [...], ...}
    let store: Arc<dyn DocumentStore> = match env::var("DB_FILE") {
        Ok(path) => {
            let seed = std::fs::read_to_string(&path)?;
            let seed = serde_json::from_str(&seed).map_err(std::io::Error::other)?;
            Arc::new(
                InMemoryDocumentStore::with_collections(seed)
                    .map_err(|err| std::io::Error::other(err.to_string()))?,
            )
        }
        Err(_) => Arc::new(InMemoryDocumentStore::new()),
    };

    println!("starting HTTP server at http://localhost:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(actix_web::web::Data::new(store.clone()))
            .wrap(TracingLogger::default())
            .configure(config_app)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
