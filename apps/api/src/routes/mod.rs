pub mod health;
pub mod upload;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::ingestion::handlers as requisitions;
use crate::referrals::handlers as referrals;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Requisitions
        .route(
            "/api/v1/requisitions",
            post(requisitions::handle_create_requisition).get(requisitions::handle_list_requisitions),
        )
        .route(
            "/api/v1/requisitions/:id/status",
            patch(requisitions::handle_update_requisition_status),
        )
        .route(
            "/api/v1/requisitions/:id/rematch",
            post(requisitions::handle_rematch),
        )
        .route(
            "/api/v1/requisitions/:id/referrals",
            get(referrals::handle_list_referrals),
        )
        // Referral decisions
        .route(
            "/api/v1/referrals/:id/status",
            patch(referrals::handle_apply_decision),
        )
        // Candidates
        .route("/api/v1/candidates", post(candidates::handle_create_candidate))
        .route(
            "/api/v1/candidates/engaged",
            get(candidates::handle_engaged_candidates),
        )
        .route(
            "/api/v1/candidates/:id",
            get(candidates::handle_get_candidate).put(candidates::handle_update_candidate),
        )
        .route(
            "/api/v1/candidates/:id/resume",
            post(candidates::handle_upload_resume),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::documents::extract::DocumentTextExtractor;
    use crate::ingestion::signal::channel;
    use crate::matching::orchestrator::PipelineSettings;
    use crate::matching::prompts::PromptSet;
    use crate::models::candidate::Availability;
    use crate::state::Components;
    use crate::test_support::{
        candidate, referral, requisition, InMemoryDocuments, InMemoryStore, ScriptedInference,
    };

    struct TestApp {
        router: Router,
        store: Arc<InMemoryStore>,
        signals: UnboundedReceiver<Uuid>,
    }

    fn app() -> TestApp {
        let store = Arc::new(InMemoryStore::new());
        let (signal, signals) = channel();
        let state = AppState::new(
            Components {
                store: store.clone(),
                documents: Arc::new(InMemoryDocuments::new()),
                extractor: Arc::new(DocumentTextExtractor),
                llm: Arc::new(ScriptedInference::new().otherwise(r#"{"skills": []}"#)),
                signal: Arc::new(signal),
            },
            &PromptSet::default(),
            PipelineSettings {
                concurrency: 4,
                horizon_days: 90,
                call_timeout: Duration::from_secs(5),
            },
        );
        TestApp {
            router: build_router(state),
            store,
            signals,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let t = app();
        let (status, body) = send(&t.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_and_fetch_candidate() {
        let t = app();
        let (status, created) = send(
            &t.router,
            json_request(
                "POST",
                "/api/v1/candidates",
                json!({"full_name": "Ines", "years_of_experience": 7, "availability": "AVAILABLE"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["availability"], "AVAILABLE");

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = send(&t.router, get(&format!("/api/v1/candidates/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["full_name"], "Ines");
    }

    #[tokio::test]
    async fn test_update_candidate_profile() {
        let t = app();
        let c = candidate("Ines", Some(7));
        let id = c.id;
        t.store.insert_candidate(c);

        let (status, body) = send(
            &t.router,
            json_request(
                "PUT",
                &format!("/api/v1/candidates/{id}"),
                json!({
                    "full_name": "Ines Duarte",
                    "years_of_experience": 8,
                    "availability": "ON_PROJECT",
                    "expected_availability_date": "2026-12-01",
                    "skills": ["postgres", "Rust"]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Ines Duarte");
        assert_eq!(body["expected_availability_date"], "2026-12-01");
        assert_eq!(body["skills"], json!(["Postgres", "Rust"]));

        let (status, body) = send(
            &t.router,
            json_request(
                "PUT",
                &format!("/api/v1/candidates/{}", Uuid::new_v4()),
                json!({"full_name": "Nobody", "availability": "AVAILABLE"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_candidate_uses_error_envelope() {
        let t = app();
        let (status, body) = send(
            &t.router,
            json_request(
                "POST",
                "/api/v1/candidates",
                json!({
                    "full_name": "Ines",
                    "availability": "AVAILABLE",
                    "expected_availability_date": "2026-12-01"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_candidate_is_404() {
        let t = app();
        let (status, body) =
            send(&t.router, get(&format!("/api/v1/candidates/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_engaged_route_is_not_shadowed_by_id_route() {
        let t = app();
        let mut c = candidate("Busy", Some(3));
        c.availability = Availability::Reserved;
        t.store.insert_candidate(c);

        let (status, body) = send(&t.router, get("/api/v1/candidates/engaged")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["availability"], "RESERVED");
    }

    #[tokio::test]
    async fn test_decision_and_recommendations() {
        let t = app();
        let req = requisition();
        let a = candidate("A", Some(5));
        let b = candidate("B", Some(5));
        let low = referral(req.id, a.id, 41);
        let high = referral(req.id, b.id, 93);
        let (req_id, high_id, b_id) = (req.id, high.id, b.id);
        t.store.insert_requisition(req);
        t.store.insert_candidate(a);
        t.store.insert_candidate(b);
        t.store.insert_referral_row(low);
        t.store.insert_referral_row(high);

        let (status, listed) =
            send(&t.router, get(&format!("/api/v1/requisitions/{req_id}/referrals"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["match_score"], 93);
        assert_eq!(listed[1]["match_score"], 41);

        let (status, updated) = send(
            &t.router,
            json_request(
                "PATCH",
                &format!("/api/v1/referrals/{high_id}/status"),
                json!({"status": "SELECTED"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "SELECTED");
        assert_eq!(t.store.candidate(b_id).unwrap().availability, Availability::OnProject);

        let (status, body) = send(
            &t.router,
            json_request(
                "PATCH",
                &format!("/api/v1/referrals/{high_id}/status"),
                json!({"status": "PENDING_REVIEW"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_multipart_ingest_signals_pipeline() {
        let mut t = app();
        let manager_id = Uuid::new_v4();
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nData Engineer\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"manager_id\"\r\n\r\n{manager_id}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"jd.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nSpark, SQL, 4+ years\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/requisitions")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let (status, created) = send(&t.router, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Data Engineer");
        assert_eq!(created["status"], "OPEN");

        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
        assert_eq!(t.signals.try_recv().unwrap(), id);

        let (status, listed) = send(
            &t.router,
            get(&format!("/api/v1/requisitions?manager_id={manager_id}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_requisition() {
        let t = app();
        let req = requisition();
        let id = req.id;
        t.store.insert_requisition(req);

        let (status, body) = send(
            &t.router,
            json_request(
                "PATCH",
                &format!("/api/v1/requisitions/{id}/status"),
                json!({"status": "CLOSED"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CLOSED");

        let (status, _) = send(
            &t.router,
            json_request("POST", &format!("/api/v1/requisitions/{id}/rematch"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
