//! HTTP trigger for crop generation.
//!
//! `POST /` (or `POST /generate-crops`) with `{"gameId": "..."}` runs one
//! [`RevealSession`] to completion and answers `{"success": true}`. Failures
//! answer `{"error": "..."}` with the status from [`RevealError::status_code`].

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::{RevealError, classify};
use crate::session::RevealSession;

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(rename = "gameId", alias = "id", default)]
    game_id: Option<RawGameId>,
}

/// Game ids arrive as strings, or as integers from tables with numeric keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGameId {
    Text(String),
    Number(serde_json::Number),
}

impl RawGameId {
    fn into_string(self) -> String {
        match self {
            RawGameId::Text(id) => id,
            RawGameId::Number(n) => n.to_string(),
        }
    }
}

impl IntoResponse for RevealError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Routes, CORS and request tracing around a shared session.
pub fn router(session: Arc<RevealSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/", post(generate_crops))
        .route("/generate-crops", post(generate_crops))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn generate_crops(
    State(session): State<Arc<RevealSession>>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RevealError> {
    let game_id = parse_body(&body)?;
    match session.run(&game_id).await {
        Ok(report) => {
            info!(game_id = %report.game_id, "crop generation complete");
            Ok(Json(json!({ "success": true })))
        }
        Err(e) => {
            if classify::is_client_error(&e) {
                warn!(game_id = %game_id, error = %e, "crop generation rejected");
            } else {
                error!(game_id = %game_id, error = %e, "crop generation failed");
            }
            Err(e)
        }
    }
}

fn parse_body(body: &[u8]) -> Result<String, RevealError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RevealError::invalid_request("gameId", "is missing"));
    }
    let parsed: GenerateBody = serde_json::from_slice(body).map_err(|e| {
        RevealError::invalid_request("body", format!("is not valid JSON: {}", e))
    })?;
    parsed
        .game_id
        .map(RawGameId::into_string)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| RevealError::invalid_request("gameId", "is missing"))
}

/// Bind `config.bind_addr` and serve until the process is stopped.
pub async fn serve(config: &ServiceConfig, session: RevealSession) -> std::io::Result<()> {
    let app = router(Arc::new(session));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(br#"{"gameId":"g1"}"#).unwrap(), "g1");
        assert_eq!(parse_body(br#"{"id":"g2"}"#).unwrap(), "g2");
        assert_eq!(parse_body(b"").unwrap_err().status_code(), 400);
        assert_eq!(parse_body(b"{}").unwrap_err().status_code(), 400);
        assert_eq!(parse_body(br#"{"gameId":"  "}"#).unwrap_err().status_code(), 400);
        assert_eq!(parse_body(b"not json").unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_parse_body_accepts_numeric_ids() {
        assert_eq!(parse_body(br#"{"id": 42}"#).unwrap(), "42");
        assert_eq!(parse_body(br#"{"gameId": 7}"#).unwrap(), "7");
        assert_eq!(parse_body(br#"{"id": true}"#).unwrap_err().status_code(), 400);
        assert_eq!(parse_body(br#"{"id": null}"#).unwrap_err().status_code(), 400);
    }
}
