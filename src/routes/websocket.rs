use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    routes::auth::{authenticate, bearer_token},
    services::websocket_service,
    state::SharedState,
};

/// Query parameters accepted by the upgrade, for clients that cannot set headers.
#[derive(Debug, Deserialize, IntoParams)]
pub struct WsParams {
    /// Bearer token.
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "realtime",
    params(WsParams),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 401, description = "Missing or invalid token")
    )
)]
/// Authenticate the caller and upgrade the connection into a realtime session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers)
        .or(params.token)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let identity = authenticate(&state, token).await?;

    let shared_state = state.clone();
    Ok(ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(shared_state, socket, identity)
    }))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
