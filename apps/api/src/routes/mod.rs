pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::interview::handlers as interview;
use crate::sessions::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route("/api/v1/sessions/:id", get(sessions::handle_get_session))
        .route("/api/v1/sessions/:id/cv", put(sessions::handle_attach_cv))
        .route(
            "/api/v1/sessions/:id/job-description",
            put(sessions::handle_attach_job_description),
        )
        // Interview
        .route(
            "/api/v1/sessions/:id/interview/start",
            post(interview::handle_start_interview),
        )
        .route(
            "/api/v1/sessions/:id/interview/answers",
            post(interview::handle_submit_answer),
        )
        .route(
            "/api/v1/sessions/:id/interview/progress",
            get(interview::handle_get_progress),
        )
        .route(
            "/api/v1/sessions/:id/interview/messages",
            get(interview::handle_get_messages),
        )
        // Feedback
        .route(
            "/api/v1/sessions/:id/feedback",
            post(feedback::handle_generate_feedback).get(feedback::handle_get_feedback),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::router::ProviderRouter;
    use crate::llm_client::testing::{ok, permanent, ScriptedProvider};
    use crate::store::MemoryStore;

    fn app(provider: Arc<ScriptedProvider>) -> Router {
        let router = ProviderRouter::new(vec![provider], RetryPolicy::default());
        build_router(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(router),
        ))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn ready_session(app: &Router) -> String {
        let response = send(
            app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({"job_title": " Backend Engineer ", "company_name": "Acme"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let session = json_body(response).await;
        assert_eq!(session["job_title"], "Backend Engineer");
        let id = session["id"].as_str().unwrap().to_string();

        for (path, text) in [("cv", "Rust, Postgres"), ("job-description", "Build APIs")] {
            let response = send(
                app,
                Method::PUT,
                &format!("/api/v1/sessions/{id}/{path}"),
                Some(json!({ "text": text })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_lists_providers() {
        let app = app(ScriptedProvider::always("p1", ok("Q")));

        let response = send(&app, Method::GET, "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["providers"][0]["name"], "p1");
        assert_eq!(body["providers"][0]["circuit_open"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interview_and_feedback_flow() {
        let provider = ScriptedProvider::scripted(
            "p1",
            vec![ok("Question: What is ownership?")],
            ok(r#"{"score": 8, "strengths": "s", "weaknesses": "w", "cv_improvements": "c"}"#),
        );
        let app = app(provider);
        let id = ready_session(&app).await;

        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/interview/start"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["question"], "What is ownership?");

        let response = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{id}/interview/progress"),
            None,
        )
        .await;
        let progress = json_body(response).await;
        assert_eq!(progress["is_started"], true);
        assert_eq!(progress["question_count"], 0);
        assert_eq!(progress["max_questions"], 8);

        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/feedback"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["score"], 8);

        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/feedback"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");

        let response = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{id}/feedback"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_answer_is_bad_request() {
        let app = app(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&app).await;
        send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/interview/start"),
            None,
        )
        .await;

        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/interview/answers"),
            Some(json!({"answer": "   "})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_session_is_not_found() {
        let app = app(ScriptedProvider::always("p1", ok("Q")));
        let response = send(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{}/interview/messages", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_outage_is_service_unavailable() {
        let app = app(ScriptedProvider::always("p1", permanent("invalid api key")));
        let id = ready_session(&app).await;

        let response = send(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/interview/start"),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "AI_SERVICE_ERROR");
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("invalid api key"));
    }
}
