pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::dialogue::handlers as dialogue;
use crate::render::handlers as render;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Render API
        .route("/api/v1/render", post(render::handle_render))
        .route("/api/v1/artifacts/:id/pdf", get(render::handle_get_pdf))
        .route("/api/v1/artifacts/:id/latex", get(render::handle_get_latex))
        .route(
            "/api/v1/views/:view_id",
            delete(render::handle_release_view),
        )
        // Dialogue API
        .route("/api/v1/sessions", post(dialogue::handle_start_session))
        .route(
            "/api/v1/sessions/:id",
            get(dialogue::handle_get_session).delete(dialogue::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/messages",
            post(dialogue::handle_post_message),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::dialogue::source::FixtureProfileSource;

    fn app() -> Router {
        let config = Config {
            analysis_delay_ms: 10,
            ..Config::default()
        };
        let source = Arc::new(FixtureProfileSource::bundled().unwrap());
        build_router(AppState::new(&config, source))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn jane_request(view_id: &str) -> Value {
        json!({
            "profile": {
                "personalInfo": { "firstName": "Jane", "lastName": "Doe" },
                "skills": ["Python"]
            },
            "variant": "general",
            "viewId": view_id
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send_json(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resume-api");
    }

    // ── render API ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_render_then_download() {
        let app = app();
        let (status, body) =
            send_json(&app, Method::POST, "/api/v1/render", Some(jane_request("preview"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "complete");
        assert_eq!(body["viewId"], "preview");
        assert_eq!(body["pdfFilename"], "Jane_Doe.pdf");
        assert_eq!(body["pageCount"], 1);

        let artifact_id = body["artifactId"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/artifacts/{artifact_id}/pdf"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Jane_Doe.pdf\""
        );
        let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let (status, tex) = send(
            &app,
            Method::GET,
            &format!("/api/v1/artifacts/{artifact_id}/latex"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(tex).unwrap().contains("\\section{Skills}"));
    }

    #[tokio::test]
    async fn test_download_header_survives_awkward_names() {
        let app = app();
        let cases = [
            ("Ja\"ne", "attachment; filename=\"Ja_ne_Doe.pdf\""),
            ("Ja\u{1}ne", "attachment; filename=\"Jane_Doe.pdf\""),
            (
                "Zoë",
                "attachment; filename=\"Zo__Doe.pdf\"; filename*=UTF-8''Zo%C3%AB_Doe.pdf",
            ),
        ];
        for (first_name, disposition) in cases {
            let request = json!({
                "profile": {
                    "personalInfo": { "firstName": first_name, "lastName": "Doe" },
                    "skills": ["Python"]
                },
                "variant": "general"
            });
            let (status, body) =
                send_json(&app, Method::POST, "/api/v1/render", Some(request)).await;
            assert_eq!(status, StatusCode::OK);

            let artifact_id = body["artifactId"].as_str().unwrap();
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/v1/artifacts/{artifact_id}/pdf"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{first_name:?}");
            assert_eq!(
                response.headers()[header::CONTENT_DISPOSITION],
                disposition,
                "{first_name:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_rerender_replaces_view_artifact() {
        let app = app();
        let (_, first) =
            send_json(&app, Method::POST, "/api/v1/render", Some(jane_request("v1"))).await;
        let (_, second) =
            send_json(&app, Method::POST, "/api/v1/render", Some(jane_request("v1"))).await;
        assert_ne!(first["artifactId"], second["artifactId"]);

        let old = first["artifactId"].as_str().unwrap();
        let (status, body) =
            send_json(&app, Method::GET, &format!("/api/v1/artifacts/{old}/pdf"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unknown_variant_is_rejected() {
        let mut request = jane_request("v1");
        request["variant"] = json!("academic");
        let (status, body) = send_json(&app(), Method::POST, "/api/v1/render", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_release_view() {
        let app = app();
        let (_, body) =
            send_json(&app, Method::POST, "/api/v1/render", Some(jane_request("closing"))).await;
        let artifact_id = body["artifactId"].as_str().unwrap().to_string();

        let (status, body) = send_json(&app, Method::DELETE, "/api/v1/views/closing", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["released"], true);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/v1/artifacts/{artifact_id}/pdf"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send_json(&app, Method::DELETE, "/api/v1/views/closing", None).await;
        assert_eq!(body["released"], false);
    }

    // ── dialogue API ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_dialogue_produces_downloadable_resume() {
        let app = app();
        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/v1/sessions",
            Some(json!({ "variant": "research" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["stage"], "awaiting_role");
        assert!(body["artifactId"].is_null());
        let id = body["id"].as_str().unwrap().to_string();
        let messages = format!("/api/v1/sessions/{id}/messages");

        let (_, body) =
            send_json(&app, Method::POST, &messages, Some(json!({ "text": "   " }))).await;
        assert_eq!(body["step"]["outcome"], "ignored");

        let (_, body) = send_json(
            &app,
            Method::POST,
            &messages,
            Some(json!({ "text": "Research Scientist" })),
        )
        .await;
        assert_eq!(body["session"]["stage"], "awaiting_description");

        let (_, body) = send_json(
            &app,
            Method::POST,
            &messages,
            Some(json!({ "text": "Lead applied ML research." })),
        )
        .await;
        assert_eq!(body["step"]["outcome"], "advanced");
        assert_eq!(body["step"]["stage"], "analyzing");

        let mut session = Value::Null;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let (_, body) =
                send_json(&app, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
            if body["stage"] == "complete" {
                session = body;
                break;
            }
        }
        assert_eq!(session["stage"], "complete", "analysis did not finish");

        let artifact_id = session["artifactId"].as_str().unwrap();
        let (status, pdf) = send(
            &app,
            Method::GET,
            &format!("/api/v1/artifacts/{artifact_id}/pdf"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let (status, body) =
            send_json(&app, Method::DELETE, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "complete");

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/v1/artifacts/{artifact_id}/pdf"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let id = uuid::Uuid::new_v4();
        let (status, body) =
            send_json(&app(), Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
