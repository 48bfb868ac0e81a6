//! HTTP surface: Telegram webhook and health check.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use encoding_rs::mem::decode_latin1;
use serde_json::json;
use tracing::{error, info, warn};

use crate::chatbot::{Dialog, DialogError, Update};

#[derive(Clone)]
pub struct AppState {
    pub dialog: Arc<Dialog>,
}

/// Create the router serving `/` and the webhook at `webhook_path`.
pub fn create_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/", get(health))
        .route(webhook_path, post(webhook))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> Result<Json<serde_json::Value>, WebhookError> {
    let update = parse_update(&body)?;
    info!("🔔 Update {}", update.update_id);

    let inbound = update.classify(state.dialog.bot_username());
    state.dialog.dispatch(inbound).await?;

    Ok(Json(json!({ "ok": true })))
}

/// Decode the body as UTF-8, falling back to ISO-8859-1, then parse the update.
pub fn parse_update(body: &[u8]) -> Result<Update, WebhookError> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => std::borrow::Cow::Borrowed(text),
        Err(_) => {
            warn!("Webhook body is not UTF-8, decoding as Latin-1");
            decode_latin1(body)
        }
    };
    serde_json::from_str(&text).map_err(WebhookError::Json)
}

/// Failures caught at the webhook boundary.
#[derive(Debug)]
pub enum WebhookError {
    /// The body was not a valid update.
    Json(serde_json::Error),
    /// Handling the update failed.
    Handler(DialogError),
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid update payload: {e}"),
            Self::Handler(e) => write!(f, "{e}"),
        }
    }
}

impl From<DialogError> for WebhookError {
    fn from(e: DialogError) -> Self {
        Self::Handler(e)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Webhook error: {}", self);

        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::openai::Completions;
    use crate::chatbot::telegram::Messenger;
    use crate::chatbot::testing::{resource_fixture, RecordingMessenger, ScriptedModel, Sent};
    use crate::chatbot::Resources;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Harness {
        _resources: TempDir,
        router: Router,
        messenger: Arc<RecordingMessenger>,
    }

    fn harness(model: ScriptedModel) -> Harness {
        let resources = resource_fixture();
        let messenger = Arc::new(RecordingMessenger::new());
        let model: Arc<dyn Completions> = Arc::new(model);
        let dialog = Dialog::new(
            Resources::new(resources.path()),
            model,
            messenger.clone() as Arc<dyn Messenger>,
            "wingman_bot".to_string(),
        );
        let router = create_router(AppState { dialog: Arc::new(dialog) }, "/api/webhook");
        Harness {
            _resources: resources,
            router,
            messenger,
        }
    }

    async fn post(router: &Router, body: impl Into<Body>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_status_and_time() {
        let h = harness(ScriptedModel::new(Vec::<String>::new()));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = h.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_malformed_json_is_structured_failure() {
        let h = harness(ScriptedModel::new(Vec::<String>::new()));
        let (status, json) = post(&h.router, "{ not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("invalid update payload"));
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_latin1_body_is_decoded() {
        let h = harness(ScriptedModel::new(Vec::<String>::new()));
        let mut body = br#"{"update_id":1,"message":{"message_id":1,"chat":{"id":5},"text":"caf"#.to_vec();
        body.push(0xE9);
        body.extend_from_slice(br#""}}"#);

        let (status, json) = post(&h.router, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        let mut body = br#"{"update_id":3,"message":{"message_id":1,"chat":{"id":5},"text":""#.to_vec();
        body.extend_from_slice(&[0x80, 0x9F, 0xE9]);
        body.extend_from_slice(br#""}}"#);

        let update = parse_update(&body).unwrap();

        let text = update.message.unwrap().text.unwrap();
        assert_eq!(text, "\u{80}\u{9f}\u{e9}");
    }

    #[tokio::test]
    async fn test_command_update_runs_dialog() {
        let h = harness(ScriptedModel::new(Vec::<String>::new()));
        let (status, json) = post(
            &h.router,
            r#"{"update_id":7,"message":{"message_id":1,"date":1700000000,"chat":{"id":5},"text":"/gpt"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "ok": true }));
        assert!(h.messenger.sent().contains(&Sent::Photo { chat_id: 5, file_name: "gpt.jpg".into() }));
    }

    #[tokio::test]
    async fn test_model_failure_is_structured_failure() {
        let h = harness(ScriptedModel::failing());
        post(&h.router, r#"{"update_id":1,"message":{"message_id":1,"chat":{"id":5},"text":"/gpt"}}"#).await;

        let (status, json) =
            post(&h.router, r#"{"update_id":2,"message":{"message_id":2,"chat":{"id":5},"text":"hi"}}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("quota"));
    }

    #[tokio::test]
    async fn test_unknown_update_is_ok() {
        let h = harness(ScriptedModel::new(Vec::<String>::new()));
        let (status, json) = post(&h.router, r#"{"update_id":9,"my_chat_member":{}}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
    }
}
