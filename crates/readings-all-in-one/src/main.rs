mod config;
mod telemetry;

use crate::config::{PublishMode, ServiceConfig};
use crate::telemetry::{init_telemetry, TelemetryConfig};
use anyhow::{Context, Result};
use readings_domain::{EnvelopeBuilder, PipelineVariant, ReadingsService, SensorPayload};
use readings_nats::{ensure_stream, NatsClient, NatsStreamTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        stream = %config.nats_stream,
        publish_mode = ?config.publish_mode,
        "Starting readings-all-in-one"
    );
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!(error = %format!("{:#}", e), "Failed to process payload");
        std::process::exit(1);
    }

    info!("Payload processed");
}

async fn run(config: ServiceConfig) -> Result<()> {
    let payload = read_payload(config.payload_path.as_deref()).await?;

    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);
    let nats_client = NatsClient::connect(&config.nats_url, startup_timeout).await?;
    let jetstream = nats_client.create_publisher_client();

    tokio::time::timeout(
        startup_timeout,
        ensure_stream(jetstream.as_ref(), &config.nats_stream),
    )
    .await
    .context("Timed out ensuring stream")??;

    let variant = match config.publish_mode {
        PublishMode::Envelope => PipelineVariant::Envelope(EnvelopeBuilder::system()),
        PublishMode::Plain => PipelineVariant::Plain {
            partition_key: config.partition_key.clone(),
        },
    };

    let service = ReadingsService::with_batch_size(
        Arc::new(NatsStreamTransport::new(jetstream)),
        config.nats_stream.clone(),
        variant,
        config.batch_size,
    )?;

    let result = service.process_payload(payload).await;
    nats_client.close().await;
    result?;

    Ok(())
}

async fn read_payload(path: Option<&str>) -> Result<SensorPayload> {
    match path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read payload from {}", path))?;
            serde_json::from_str(&raw).context("Failed to parse payload")
        }
        None => read_payload_from(tokio::io::stdin()).await,
    }
}

async fn read_payload_from<R>(mut reader: R) -> Result<SensorPayload>
where
    R: AsyncRead + Unpin,
{
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .await
        .context("Failed to read payload from stdin")?;

    serde_json::from_str(&raw).context("Failed to parse payload")
}
