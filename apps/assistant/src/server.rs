// HTTP chat server
//
// JSON endpoints over ChatService plus an optional static web UI.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use umi_assist_core::context::{SessionSummary, StoredMessage};
use umi_assist_core::{AssistError, ChatService};

use crate::config::ServerConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatReply {
    session_id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct SessionList {
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionMessages {
    session_id: String,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

impl LimitQuery {
    fn limit(&self) -> Option<usize> {
        parse_limit(self.limit.as_deref())
    }
}

/// Non-numeric or negative limits mean "use the default"
pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
}

/// Maps service errors onto status codes
struct ApiError {
    context: &'static str,
    inner: AssistError,
}

impl ApiError {
    fn wrap(context: &'static str) -> impl FnOnce(AssistError) -> ApiError {
        move |inner| ApiError { context, inner }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.inner {
            AssistError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(target = "server", error = %self.inner, "{}", self.context);
        }
        (status, format!("{}: {}", self.context, self.inner)).into_response()
    }
}

pub fn router(service: Arc<ChatService>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/sessions/:id/messages", get(messages_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(service);

    let app = match static_dir {
        Some(dir) if dir.is_dir() => {
            info!(target = "server", dir = %dir.display(), "Serving static files");
            api.fallback_service(ServeDir::new(dir))
        }
        Some(dir) => {
            warn!(target = "server", dir = %dir.display(), "Static directory not found; skipping static file serving");
            api
        }
        None => api,
    };

    app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Bind and serve until the process is stopped
pub async fn serve(
    service: Arc<ChatService>,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(service, config.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(
        target = "server",
        url = %format!("http://{}", config.addr),
        "Chat server ready"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat_handler(
    State(service): State<Arc<ChatService>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let session = Some(req.session_id.as_str()).filter(|s| !s.trim().is_empty());
    let outcome = service
        .handle_turn(session, &req.message)
        .await
        .map_err(ApiError::wrap("chat error"))?;
    Ok(Json(ChatReply {
        session_id: outcome.session_id,
        message: outcome.response,
    }))
}

async fn sessions_handler(
    State(service): State<Arc<ChatService>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<SessionList>, ApiError> {
    let sessions = service
        .list_sessions(q.limit())
        .await
        .map_err(ApiError::wrap("list sessions error"))?;
    Ok(Json(SessionList { sessions }))
}

async fn messages_handler(
    State(service): State<Arc<ChatService>>,
    UrlPath(id): UrlPath<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<SessionMessages>, ApiError> {
    let messages = service
        .session_messages(&id, q.limit())
        .await
        .map_err(ApiError::wrap("load session messages error"))?;
    Ok(Json(SessionMessages {
        session_id: id,
        messages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use umi_assist_core::dialogue::REDIRECT_MESSAGE;
    use umi_assist_core::{Catalog, CompletionPort, InMemoryHistory, PipelineConfig};

    struct Offline;

    #[async_trait]
    impl CompletionPort for Offline {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> umi_assist_core::Result<String> {
            Err(AssistError::Completion("offline".into()))
        }
    }

    fn app() -> Router {
        let service = ChatService::new(
            Arc::new(Offline),
            Arc::new(Catalog::default()),
            InMemoryHistory::new(),
            PipelineConfig::default(),
        );
        router(Arc::new(service), None)
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat(body: &str) -> Request<Body> {
        Request::post("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(Some("25")), Some(25));
        assert_eq!(parse_limit(Some("-3")), None);
        assert_eq!(parse_limit(Some("abc")), None);
        assert_eq!(parse_limit(Some("0")), None);
        assert_eq!(parse_limit(None), None);
    }

    #[tokio::test]
    async fn chat_then_list_and_read_back() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(chat(r#"{"message": "I want to buy a car"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let reply = body_json(resp).await;
        assert_eq!(reply["message"], REDIRECT_MESSAGE);
        let session = reply["sessionId"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(Request::get("/api/sessions?limit=-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let list = body_json(resp).await;
        assert_eq!(list["sessions"][0]["id"], session.as_str());
        assert_eq!(list["sessions"][0]["messageCount"], 2);

        let uri = format!("/api/sessions/{session}/messages?limit=1");
        let resp = app
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let messages = body_json(resp).await;
        assert_eq!(messages["messages"].as_array().unwrap().len(), 1);
        assert_eq!(messages["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let resp = app().oneshot(chat(r#"{"sessionId": "s1", "message": "  "}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz() {
        let resp = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), 16).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
