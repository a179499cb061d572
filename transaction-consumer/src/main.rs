use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common_kafka::kafka_consumer::SingleTopicConsumer;
use common_metrics::{setup_metrics_recorder, setup_metrics_routes};
use envconfig::Envconfig;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use transaction_consumer::app::{create_router, AppState};
use transaction_consumer::config::Config;
use transaction_consumer::consumer::TransactionConsumer;
use transaction_consumer::source::KafkaEventSource;
use transaction_consumer::store::PgTransactionEventStore;

async fn shutdown_signal(shutdown: CancellationToken) -> anyhow::Result<()> {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to register SIGTERM handler")?;

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .context("failed to register SIGINT handler")?;

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
        _ = shutdown.cancelled() => return Ok(()),
    };

    info!("Shutting down gracefully...");
    shutdown.cancel();
    Ok(())
}

fn setup_tracing() {
    let log_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(log_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = Config::init_from_env().context("failed to load configuration from env")?;
    info!("Starting transaction-consumer on {}", config.bind());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_pg_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;

    if config.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let store = Arc::new(PgTransactionEventStore::new(pool));

    let kafka_consumer = SingleTopicConsumer::new(&config.kafka, &config.consumer)
        .context("failed to create kafka consumer")?;
    info!(topic = kafka_consumer.topic(), "subscribed to topic");
    let source = Arc::new(KafkaEventSource::new(kafka_consumer));

    let shutdown = CancellationToken::new();
    let signal_handle = tokio::spawn(shutdown_signal(shutdown.clone()));

    let recorder = setup_metrics_recorder().context("failed to install metrics recorder")?;
    let app = create_router(AppState {
        reader: store.clone(),
    });
    let app = setup_metrics_routes(app, recorder);

    let server_shutdown = shutdown.clone();
    let bind = config.bind();
    let server_handle = tokio::spawn(async move {
        common_metrics::serve(app, &bind, async move {
            server_shutdown.cancelled().await
        })
        .await
    });

    let consumer = TransactionConsumer::new(
        source,
        store,
        config.batch_size,
        config.batch_timeout_ms.0,
    );
    let consumer_result = consumer.run(shutdown.clone()).await;

    // Also stops the HTTP server when the loop failed
    shutdown.cancel();

    match server_handle.await {
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
        Ok(Ok(())) => {}
    }
    match signal_handle.await {
        Ok(Err(e)) => error!("Signal handler error: {}", e),
        Err(e) => error!("Signal handler task failed: {}", e),
        Ok(Ok(())) => {}
    }

    consumer_result.context("transaction consumer failed")?;
    info!("transaction-consumer stopped");
    Ok(())
}
