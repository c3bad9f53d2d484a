//! Relay information document (C10) and the WebSocket upgrade route.
//!
//! Grounded on the teacher's `handler` function: a single `/` route that
//! either upgrades to a WebSocket, serves the NIP-11-shaped JSON document
//! when `Accept: application/nostr+json` is present, or falls back to a
//! plaintext banner.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use crate::connection::handle_socket;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root(
    ws: Option<WebSocketUpgrade>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if let Some(ws) = ws {
        let relay = state.relay.clone();
        let pool = state.pool.clone();
        return ws
            .on_upgrade(move |socket| handle_socket(socket, relay, pool))
            .into_response();
    }

    let wants_relay_info = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/nostr+json"))
        .unwrap_or(false);

    if wants_relay_info {
        return Json(serde_json::json!({
            "name": state.relay_info.name,
            "description": state.relay_info.description,
            "pubkey": state.relay_info.pubkey,
            "contact": state.relay_info.contact,
            "supported_nips": state.relay_info.supported_nips,
            "software": state.relay_info.software,
            "version": state.relay_info.version,
            "relay_countries": state.relay_info.relay_countries,
            "language_tags": state.relay_info.language_tags,
            "posting_policy": state.relay_info.posting_policy,
        }))
        .into_response();
    }

    "nostr relay".into_response()
}
