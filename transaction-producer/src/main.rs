use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use common_kafka::kafka_producer::create_kafka_producer;
use common_metrics::{setup_metrics_recorder, setup_metrics_routes};
use envconfig::Envconfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use transaction_producer::config::Config;
use transaction_producer::generator::TransactionGenerator;
use transaction_producer::producer::{DriverSettings, TransactionProducer};
use transaction_producer::sink::KafkaEventSink;

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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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

    let config = Config::init_from_env().context("failed to load configuration from env")?;
    info!(
        topic = %config.kafka_topic,
        "Starting transaction-producer, metrics on {}",
        config.bind()
    );

    let generator = TransactionGenerator::new(
        config.distinct_users,
        config.amount_from,
        config.amount_to,
    )?;

    let producer = create_kafka_producer(&config.kafka)
        .await
        .context("failed to create kafka producer")?;
    let sink = Arc::new(KafkaEventSink::new(producer, config.kafka_topic.clone()));

    let shutdown = CancellationToken::new();
    let signal_handle = tokio::spawn(shutdown_signal(shutdown.clone()));

    let recorder = setup_metrics_recorder().context("failed to install metrics recorder")?;
    let router = Router::new()
        .route("/", get(|| async { "transaction-producer" }))
        .route("/_liveness", get(|| async { "ok" }))
        .route("/_readiness", get(|| async { "ok" }));
    let router = setup_metrics_routes(router, recorder);

    let server_shutdown = shutdown.clone();
    let bind = config.bind();
    let server_handle = tokio::spawn(async move {
        common_metrics::serve(router, &bind, async move {
            server_shutdown.cancelled().await
        })
        .await
    });

    let settings = DriverSettings {
        initial_batch_size: config.initial_batch_size,
        creation_rps: config.creation_rps,
        min_workers: config.min_workers,
        ..Default::default()
    };
    let driver = TransactionProducer::new(generator, sink, settings);
    let result = driver.run(shutdown.clone()).await;

    shutdown.cancel();

    match server_handle.await {
        Ok(Err(e)) => error!("Metrics server error: {}", e),
        Err(e) => error!("Metrics server task failed: {}", e),
        Ok(Ok(())) => {}
    }
    match signal_handle.await {
        Ok(Err(e)) => error!("Signal handler error: {}", e),
        Err(e) => error!("Signal handler task failed: {}", e),
        Ok(Ok(())) => {}
    }

    result.context("transaction producer failed")?;
    info!("transaction-producer stopped");
    Ok(())
}
