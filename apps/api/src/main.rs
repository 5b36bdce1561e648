mod candidates;
mod config;
mod db;
mod documents;
mod errors;
mod ingestion;
mod llm_client;
mod matching;
mod models;
mod referrals;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, StorageConfig};
use crate::db::create_pool;
use crate::documents::extract::DocumentTextExtractor;
use crate::documents::filesystem::FilesystemStore;
use crate::documents::s3::S3Store;
use crate::documents::DocumentStore;
use crate::ingestion::signal::{self, IngestSignal, RedisSignal, SignalSource};
use crate::llm_client::LlmClient;
use crate::matching::orchestrator::PipelineSettings;
use crate::matching::prompts::PromptSet;
use crate::routes::build_router;
use crate::state::{AppState, Components};
use crate::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting IntelliRefer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize document storage
    let documents: Arc<dyn DocumentStore> = match &config.storage {
        StorageConfig::Filesystem { root } => {
            tokio::fs::create_dir_all(root)
                .await
                .with_context(|| format!("Cannot create storage root {}", root.display()))?;
            info!("Filesystem document store at {}", root.display());
            Arc::new(FilesystemStore::new(root.clone()))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let client = build_s3_client(endpoint, access_key_id, secret_access_key).await;
            info!("S3 document store (bucket: {bucket})");
            Arc::new(S3Store::new(client, bucket.clone()))
        }
    };

    // Initialize LLM client
    let mut llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.llm_timeout,
    )?;
    if let Some(url) = &config.llm_api_url {
        llm = llm.with_endpoint(url.clone());
    }
    info!(
        "LLM client initialized (model: {}, attempt timeout {:?}, call budget {:?})",
        llm.model(),
        config.llm_timeout,
        config.call_timeout
    );

    // Prompt templates
    let prompts = match &config.prompts_file {
        Some(path) => PromptSet::load(path)
            .with_context(|| format!("Invalid prompt file {}", path.display()))?,
        None => PromptSet::default(),
    };
    info!(
        "Prompt versions: requirement={}, match={}, skills={}",
        prompts.requirement_extraction.version, prompts.match_score.version, prompts.skill_extraction.version
    );

    // Ingestion signal: Redis list when configured, in-process channel otherwise
    let (ingest_signal, source): (Arc<dyn IngestSignal>, SignalSource) = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Ingestion signal on redis list '{}'", config.signal_queue_key);
            let publisher: Arc<dyn IngestSignal> =
                Arc::new(RedisSignal::new(client.clone(), config.signal_queue_key.clone()));
            (
                publisher,
                SignalSource::Redis {
                    client,
                    key: config.signal_queue_key.clone(),
                },
            )
        }
        None => {
            let (tx, rx) = signal::channel();
            info!("Ingestion signal on in-process channel");
            let publisher: Arc<dyn IngestSignal> = Arc::new(tx);
            (publisher, SignalSource::Channel(rx))
        }
    };

    // Build app state
    let state = AppState::new(
        Components {
            store,
            documents,
            extractor: Arc::new(DocumentTextExtractor),
            llm: Arc::new(llm),
            signal: ingest_signal,
        },
        &prompts,
        PipelineSettings {
            concurrency: config.match_concurrency,
            horizon_days: config.horizon_days,
            call_timeout: config.call_timeout,
        },
    );
    info!(
        "Matching pipeline ready (concurrency {}, horizon {} days)",
        config.match_concurrency, config.horizon_days
    );

    signal::spawn_consumer(source, state.orchestrator.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(
    endpoint: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "intellirefer-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
