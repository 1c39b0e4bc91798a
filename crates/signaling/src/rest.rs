//! REST-Endpunkte fuer Session-Lookup und Health-Check
//!
//! - `GET /api/sessions/:code` liefert Session-Infos (Code case-insensitiv)
//! - `GET /api/health` liefert Status und Zaehler

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Fehler-Body fuer REST-Antworten
#[derive(Debug, Serialize)]
struct FehlerAntwort {
    error: &'static str,
}

/// Baut den Router fuer die REST-Endpunkte
pub fn rest_router(state: Arc<SignalingState>) -> Router {
    Router::new()
        .route("/api/sessions/:code", get(session_abfragen))
        .route("/api/health", get(health_abfragen))
        .with_state(state)
}

async fn session_abfragen(
    State(state): State<Arc<SignalingState>>,
    Path(code): Path<String>,
) -> Response {
    match state.sessions.nach_code(&code) {
        Some(session) => Json(session.info()).into_response(),
        None => {
            tracing::debug!(code = %code, "Session-Lookup ohne Treffer");
            (
                StatusCode::NOT_FOUND,
                Json(FehlerAntwort {
                    error: "Session not found",
                }),
            )
                .into_response()
        }
    }
}

async fn health_abfragen(State(state): State<Arc<SignalingState>>) -> Response {
    let antwort = state
        .health
        .antwort(state.sessions.anzahl(), state.registry.anzahl());
    (antwort.http_status(), Json(antwort)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::test_hilfe::test_state;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use partyhub_core::types::ConnectionId;
    use tower::ServiceExt;

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn session_lookup_case_insensitiv() {
        let state = test_state();
        let session = state
            .sessions
            .session_erstellen(&ConnectionId::from("host"), "quiz")
            .unwrap();

        let uri = format!("/api/sessions/{}", session.code.to_lowercase());
        let response = rest_router(Arc::clone(&state))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["code"], session.code.as_str());
        assert_eq!(body["gameId"], "quiz");
        assert_eq!(body["state"], "Lobby");
        assert_eq!(body["playerCount"], 0);
    }

    #[tokio::test]
    async fn unbekannter_code_ist_404() {
        let response = rest_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/ZZZZ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_liefert_zaehler() {
        let state = test_state();
        let (_id, _rx) = state.registry.registrieren();

        let response = rest_router(Arc::clone(&state))
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["activeSessions"], 0);
        assert_eq!(body["connectedClients"], 1);
    }
}
