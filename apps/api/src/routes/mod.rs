pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session lifecycle
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:session_id",
            delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:session_id/rate-limit",
            get(handlers::handle_rate_limit),
        )
        // API-backed interactions
        .route(
            "/api/v1/sessions/:session_id/document",
            post(handlers::handle_upload_document),
        )
        .route(
            "/api/v1/sessions/:session_id/generate",
            post(handlers::handle_generate),
        )
        .route(
            "/api/v1/sessions/:session_id/evaluate",
            post(handlers::handle_evaluate),
        )
        // Transcript
        .route(
            "/api/v1/sessions/:session_id/history",
            get(handlers::handle_history).delete(handlers::handle_clear_history),
        )
        .route(
            "/api/v1/sessions/:session_id/history/:round",
            get(handlers::handle_load_round),
        )
        .route(
            "/api/v1/sessions/:session_id/reset",
            post(handlers::handle_reset),
        )
        .route(
            "/api/v1/sessions/:session_id/export/text",
            get(handlers::handle_export_text),
        )
        .route(
            "/api/v1/sessions/:session_id/export/pdf",
            get(handlers::handle_export_pdf),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::export::export_pdf;
    use crate::llm_client::retrying::tests::ScriptedGenerator;
    use crate::llm_client::RetryingClient;
    use crate::session::transcript::tests::sample_entry;
    use crate::session::SessionStore;

    fn app(generator: Arc<ScriptedGenerator>) -> Router {
        build_router(AppState {
            sessions: SessionStore::new(),
            llm: RetryingClient::new(generator, "gemini-2.5-flash"),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = send(app, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn upload_request(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
        const BOUNDARY: &str = "interview-coach-test-boundary";
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn five_page_pdf() -> Vec<u8> {
        let rounds: Vec<_> = ["alpha", "bravo", "charlie", "delta"]
            .into_iter()
            .map(sample_entry)
            .collect();
        export_pdf(&rounds, "2026-01-01 00:00:00").unwrap().unwrap()
    }

    fn generate_body(job: &str) -> Value {
        json!({
            "job_or_jd": job,
            "category": "Domain-specific",
            "difficulty": "Hard",
            "experience_level": "Mid-level"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedGenerator::new(vec![]));
        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "interview-coach");
        assert_eq!(body["active_sessions"], 0);

        create_session(&app).await;
        let body = json_body(send(&app, Method::GET, "/health", None).await).await;
        assert_eq!(body["active_sessions"], 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app(ScriptedGenerator::new(vec![]));
        let uri = format!("/api/v1/sessions/{}/generate", Uuid::new_v4());
        let response = send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_blank_generate_is_400() {
        let app = app(ScriptedGenerator::new(vec![]));
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/generate");
        let response = send(&app, Method::POST, &uri, Some(generate_body("  "))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_generate_is_cached_and_not_throttled() {
        let generator = ScriptedGenerator::always_ok("1. **Q:** What is Send?", 1);
        let app = app(generator.clone());
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/generate");

        let first = send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        assert_eq!(first["cached"], false);
        assert_eq!(first["round_index"], 0);

        let second = send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;
        assert_eq!(second.status(), StatusCode::OK);
        let second = json_body(second).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["round_index"], 1);
        assert_eq!(second["questions"], first["questions"]);
        assert_eq!(second["retry_events"], json!([{ "event": "cache_hit" }]));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_uncached_call_inside_interval_is_throttled() {
        let generator = ScriptedGenerator::always_ok("qas", 2);
        let app = app(generator.clone());
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/generate");

        let first = send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = send(&app, Method::POST, &uri, Some(generate_body("Go dev"))).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(second).await;
        assert_eq!(body["error"]["code"], "THROTTLED");
        assert!(body["error"]["retry_after_seconds"].as_f64().unwrap() > 0.0);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluate_records_into_history_and_exports() {
        let generator = ScriptedGenerator::new(vec![Ok("qas".into()), Ok("Score: 9/10".into())]);
        let app = app(generator);
        let id = create_session(&app).await;

        let uri = format!("/api/v1/sessions/{id}/export/text");
        let empty = send(&app, Method::GET, &uri, None).await;
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);

        let uri = format!("/api/v1/sessions/{id}/generate");
        send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;
        tokio::time::advance(std::time::Duration::from_secs(6)).await;

        let uri = format!("/api/v1/sessions/{id}/evaluate");
        let body = json!({ "question": "What is Send?", "user_answer": "A marker trait." });
        let response = send(&app, Method::POST, &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let evaluation = json_body(response).await;
        assert_eq!(evaluation["recorded_in"], 0);
        assert_eq!(evaluation["feedback"], "Score: 9/10");

        let uri = format!("/api/v1/sessions/{id}/history/0");
        let round = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(round["index"], 0);
        assert_eq!(round["category"], "Domain-specific");
        assert_eq!(round["evaluations"][0]["feedback"], "Score: 9/10");

        let uri = format!("/api/v1/sessions/{id}/export/text");
        let export = send(&app, Method::GET, &uri, None).await;
        assert_eq!(export.status(), StatusCode::OK);
        let disposition = export.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"interview_history_"));
        assert!(disposition.ends_with(".txt\""));

        let uri = format!("/api/v1/sessions/{id}/export/pdf");
        let pdf = send(&app, Method::GET, &uri, None).await;
        assert_eq!(pdf.status(), StatusCode::OK);
        assert_eq!(pdf.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = to_bytes(pdf.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_evaluate_unknown_round_is_409() {
        let generator = ScriptedGenerator::new(vec![]);
        let app = app(generator.clone());
        let id = create_session(&app).await;

        let uri = format!("/api/v1/sessions/{id}/evaluate");
        let body = json!({ "question": "q", "user_answer": "a", "round_index": 2 });
        let response = send(&app, Method::POST, &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_history_and_end_session() {
        let app = app(ScriptedGenerator::always_ok("qas", 1));
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/generate");
        send(&app, Method::POST, &uri, Some(generate_body("Rust dev"))).await;

        let uri = format!("/api/v1/sessions/{id}/history");
        let cleared = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(cleared.status(), StatusCode::NO_CONTENT);
        let history = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(history["total"], 0);
        assert_eq!(history["current_round"], Value::Null);

        let uri = format!("/api/v1/sessions/{id}");
        assert_eq!(
            send(&app, Method::DELETE, &uri, None).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            send(&app, Method::DELETE, &uri, None).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_rate_limit_starts_open() {
        let app = app(ScriptedGenerator::new(vec![]));
        let id = create_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/rate-limit");
        let body = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(body["allowed"], true);
        assert_eq!(body["remaining_wait_seconds"], 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uploaded_document_summary_feeds_generation() {
        let generator = ScriptedGenerator::new(vec![
            Ok("**Ada Lovelace** is a compiler engineer.".into()),
            Ok("1. **Q:** What is MIR?".into()),
        ]);
        let app = app(generator.clone());
        let id = create_session(&app).await;

        let uri = format!("/api/v1/sessions/{id}/document");
        let request = upload_request(&uri, "file", &five_page_pdf());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let upload = json_body(response).await;
        assert_eq!(upload["pages_read"], 3);
        assert_eq!(upload["truncated"], false);
        assert_eq!(upload["cached"], false);
        assert_eq!(upload["summary"], "**Ada Lovelace** is a compiler engineer.");

        tokio::time::advance(std::time::Duration::from_secs(6)).await;

        // A blank job description is accepted once a summary is stored.
        let uri = format!("/api/v1/sessions/{id}/generate");
        let response = send(&app, Method::POST, &uri, Some(generate_body(""))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let uri = format!("/api/v1/sessions/{id}/history/0");
        let round = json_body(send(&app, Method::GET, &uri, None).await).await;
        assert_eq!(
            round["document_summary"],
            "**Ada Lovelace** is a compiler engineer."
        );
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_400() {
        let generator = ScriptedGenerator::new(vec![]);
        let app = app(generator.clone());
        let id = create_session(&app).await;

        let uri = format!("/api/v1/sessions/{id}/document");
        let request = upload_request(&uri, "attachment", &five_page_pdf());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_of_non_pdf_is_422() {
        let generator = ScriptedGenerator::new(vec![]);
        let app = app(generator.clone());
        let id = create_session(&app).await;

        let uri = format!("/api/v1/sessions/{id}/document");
        let request = upload_request(&uri, "file", b"not a pdf at all");
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "DOCUMENT_ERROR");
        assert_eq!(generator.call_count(), 0);
    }
}
