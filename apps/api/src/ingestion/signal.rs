//! "Requisition ingested" handoff between the ingestion write and the pipeline.
//!
//! Publishing happens only after the requisition row has committed. Consumers
//! may see the same id more than once; the pipeline's writes are idempotent.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::matching::orchestrator::PipelineOrchestrator;

pub const DEFAULT_QUEUE_KEY: &str = "intellirefer:requisitions:ingested";
const BRPOP_TIMEOUT_SECS: u64 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal channel closed")]
    Closed,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed signal payload '{0}'")]
    Malformed(String),
}

#[async_trait]
pub trait IngestSignal: Send + Sync {
    async fn publish(&self, requisition_id: Uuid) -> Result<(), SignalError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process channel
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ChannelSignal {
    tx: mpsc::UnboundedSender<Uuid>,
}

pub fn channel() -> (ChannelSignal, mpsc::UnboundedReceiver<Uuid>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSignal { tx }, rx)
}

#[async_trait]
impl IngestSignal for ChannelSignal {
    async fn publish(&self, requisition_id: Uuid) -> Result<(), SignalError> {
        self.tx.send(requisition_id).map_err(|_| SignalError::Closed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisSignal {
    client: redis::Client,
    key: String,
}

impl RedisSignal {
    pub fn new(client: redis::Client, key: String) -> Self {
        Self { client, key }
    }
}

#[async_trait]
impl IngestSignal for RedisSignal {
    async fn publish(&self, requisition_id: Uuid) -> Result<(), SignalError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(requisition_id.to_string())
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }
}

pub fn parse_payload(payload: &str) -> Result<Uuid, SignalError> {
    Uuid::parse_str(payload.trim()).map_err(|_| SignalError::Malformed(payload.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Consumers
// ────────────────────────────────────────────────────────────────────────────

pub enum SignalSource {
    Channel(mpsc::UnboundedReceiver<Uuid>),
    Redis { client: redis::Client, key: String },
}

/// Runs the consumer loop on its own task.
pub fn spawn_consumer(source: SignalSource, orchestrator: PipelineOrchestrator) -> JoinHandle<()> {
    tokio::spawn(async move {
        match source {
            SignalSource::Channel(rx) => consume_channel(rx, orchestrator).await,
            SignalSource::Redis { client, key } => consume_redis(client, key, orchestrator).await,
        }
    })
}

/// Returns once every sender is dropped and the runs already started have finished.
pub async fn consume_channel(mut rx: mpsc::UnboundedReceiver<Uuid>, orchestrator: PipelineOrchestrator) {
    info!("Ingestion consumer listening on in-process channel");
    let mut runs = JoinSet::new();
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(requisition_id) => {
                    info!("Received ingestion signal for requisition {requisition_id}");
                    let orchestrator = orchestrator.clone();
                    runs.spawn(async move { orchestrator.run(requisition_id).await });
                }
                None => break,
            },
            Some(_) = runs.join_next(), if !runs.is_empty() => {}
        }
    }
    info!("Ingestion channel closed; waiting for {} runs", runs.len());
    while runs.join_next().await.is_some() {}
    info!("Ingestion consumer stopped");
}

pub async fn consume_redis(client: redis::Client, key: String, orchestrator: PipelineOrchestrator) {
    info!("Ingestion consumer listening on redis list '{key}'");
    loop {
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis connection failed, retrying in {RECONNECT_DELAY:?}: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        loop {
            let popped = redis::cmd("BRPOP")
                .arg(&key)
                .arg(BRPOP_TIMEOUT_SECS)
                .query_async::<_, Option<(String, String)>>(&mut conn)
                .await;

            match popped {
                Ok(Some((_, payload))) => match parse_payload(&payload) {
                    Ok(requisition_id) => {
                        info!("Received ingestion signal for requisition {requisition_id}");
                        orchestrator.trigger(requisition_id);
                    }
                    Err(e) => error!("Discarding ingestion signal: {e}"),
                },
                Ok(None) => {}
                Err(e) => {
                    warn!("Redis BRPOP failed, reconnecting: {e}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    break;
                }
            }
        }
    }
}
