use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::ingestion::signal::DEFAULT_QUEUE_KEY;
use crate::llm_client::{retry_budget, DEFAULT_MODEL};
use crate::matching::filter::DEFAULT_HORIZON_DAYS;
use crate::matching::orchestrator::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Filesystem {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_api_url: Option<String>,
    /// Per-attempt timeout inside the inference client.
    pub llm_timeout: Duration,
    /// Caller-side limit on one inference call, retries included.
    pub call_timeout: Duration,
    pub match_concurrency: usize,
    pub horizon_days: u32,
    pub prompts_file: Option<PathBuf>,
    pub storage: StorageConfig,
    pub redis_url: Option<String>,
    pub signal_queue_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("filesystem") {
            "filesystem" => StorageConfig::Filesystem {
                root: PathBuf::from(var("STORAGE_ROOT").unwrap_or_else(|| "./storage".to_string())),
            },
            "s3" => StorageConfig::S3 {
                bucket: require("S3_BUCKET")?,
                endpoint: require("S3_ENDPOINT")?,
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            },
            other => bail!("STORAGE_BACKEND must be 'filesystem' or 's3', got '{other}'"),
        };

        let match_concurrency: usize = parse_or(&var, "MATCH_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if match_concurrency == 0 {
            bail!("MATCH_CONCURRENCY must be at least 1");
        }

        let llm_timeout = Duration::from_secs(parse_or(&var, "LLM_TIMEOUT_SECS", 60u64)?);
        let call_timeout = match var("MATCH_CALL_TIMEOUT_SECS") {
            Some(_) => Duration::from_secs(parse_or(&var, "MATCH_CALL_TIMEOUT_SECS", 0u64)?),
            None => retry_budget(llm_timeout),
        };
        if call_timeout <= llm_timeout {
            bail!(
                "MATCH_CALL_TIMEOUT_SECS ({}s) must exceed LLM_TIMEOUT_SECS ({}s) so retries can run",
                call_timeout.as_secs(),
                llm_timeout.as_secs()
            );
        }

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_api_url: var("LLM_API_URL"),
            llm_timeout,
            call_timeout,
            match_concurrency,
            horizon_days: parse_or(&var, "AVAILABILITY_HORIZON_DAYS", DEFAULT_HORIZON_DAYS)?,
            prompts_file: var("PROMPTS_FILE").map(PathBuf::from),
            storage,
            redis_url: var("REDIS_URL"),
            signal_queue_key: var("SIGNAL_QUEUE_KEY").unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
            port: parse_or(&var, "PORT", 8080u16)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
