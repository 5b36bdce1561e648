//! Fixtures and fakes shared by unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::documents::{new_key, validate_key, DocumentError, DocumentStore};
use crate::llm_client::{InferenceClient, LlmError};
use crate::models::candidate::{Availability, Candidate};
use crate::models::referral::{Referral, ReferralStatus};
use crate::models::requisition::{Requisition, RequisitionStatus};

pub use crate::store::memory::InMemoryStore;

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

/// An open requisition whose document lives at `requisitions/<id>.txt`.
pub fn requisition() -> Requisition {
    let id = Uuid::new_v4();
    Requisition {
        id,
        title: "Backend Engineer".to_string(),
        client_name: Some("Acme".to_string()),
        document_path: format!("requisitions/{id}.txt"),
        status: RequisitionStatus::Open,
        required_experience: None,
        manager_id: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

/// An available candidate whose resume lives at `resumes/<id>.txt`.
pub fn candidate(name: &str, years: Option<i32>) -> Candidate {
    let id = Uuid::new_v4();
    Candidate {
        id,
        full_name: name.to_string(),
        years_of_experience: years,
        availability: Availability::Available,
        expected_availability_date: None,
        resume_path: Some(format!("resumes/{id}.txt")),
        skills: vec![],
        updated_at: Utc::now(),
    }
}

pub fn referral(requisition_id: Uuid, candidate_id: Uuid, score: i32) -> Referral {
    let now = Utc::now();
    Referral {
        id: Uuid::new_v4(),
        requisition_id,
        candidate_id,
        match_score: score,
        justification: "Fixture".to_string(),
        matching_skills: vec![],
        status: ReferralStatus::PendingReview,
        created_at: now,
        updated_at: now,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

/// A minimal `.docx` whose body holds one paragraph per entry.
pub fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[derive(Default)]
pub struct InMemoryDocuments {
    files: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from(content.to_string()));
    }

    pub fn put_bytes(&self, key: &str, content: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from(content));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocuments {
    async fn store(
        &self,
        bytes: Bytes,
        subfolder: &str,
        file_name: &str,
    ) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        let key = new_key(subfolder, file_name)?;
        self.files.lock().unwrap().insert(key.clone(), bytes);
        Ok(key)
    }

    async fn load(&self, path: &str) -> Result<Bytes, DocumentError> {
        validate_key(path)?;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), DocumentError> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inference
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Script {
    Respond(String),
    Fail(String),
    Hang,
}

/// Inference fake that answers by the first rule whose needle occurs in the
/// prompt.
#[derive(Default)]
pub struct ScriptedInference {
    rules: Vec<(String, Script)>,
    fallback: Option<String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Script::Respond(response.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, message: &str) -> Self {
        self.rules
            .push((needle.to_string(), Script::Fail(message.to_string())));
        self
    }

    /// Calls matching `needle` never complete.
    pub fn hang_when(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Script::Hang));
        self
    }

    /// Response for prompts no rule matches.
    pub fn otherwise(mut self, response: &str) -> Self {
        self.fallback = Some(response.to_string());
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn script_for(&self, prompt: &str) -> Option<Script> {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, script)| script.clone())
            .or_else(|| self.fallback.clone().map(Script::Respond))
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = match self.script_for(prompt) {
            Some(Script::Respond(body)) => Ok(body),
            Some(Script::Fail(message)) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            Some(Script::Hang) => std::future::pending().await,
            None => Err(LlmError::EmptyContent),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Messages API stand-in
// ────────────────────────────────────────────────────────────────────────────

/// Local HTTP server speaking the Messages API shape. The first `failures`
/// requests wait `stall` and then answer 503; later ones return `text`.
pub struct FlakyMessagesApi {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl FlakyMessagesApi {
    pub async fn start(failures: usize, stall: Duration, text: &str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let body = json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 12, "output_tokens": 8}
        });

        let app = Router::new().route(
            "/v1/messages",
            post(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < failures {
                        tokio::time::sleep(stall).await;
                        (StatusCode::SERVICE_UNAVAILABLE, "overloaded").into_response()
                    } else {
                        Json(body).into_response()
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/messages", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Logs
// ────────────────────────────────────────────────────────────────────────────

/// Captures formatted `tracing` output for the current thread. Spawned tasks
/// are included under the default current-thread test runtime.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

pub struct LogCaptureGuard {
    capture: LogCapture,
    _default: tracing::subscriber::DefaultGuard,
}

impl LogCapture {
    pub fn install() -> LogCaptureGuard {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        LogCaptureGuard {
            capture,
            _default: tracing::subscriber::set_default(subscriber),
        }
    }
}

impl LogCaptureGuard {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.capture.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
