use axum::{Router, middleware};

use crate::state::SharedState;

pub mod auth;
pub mod catalog;
pub mod docs;
pub mod health;
pub mod judging;
pub mod submissions;
pub mod teams;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// Everything but the health check, the docs and the WebSocket upgrade (which checks its own
/// token) requires a bearer token.
pub fn router(state: SharedState) -> Router<()> {
    let protected = submissions::router()
        .merge(teams::router())
        .merge(judging::router())
        .merge(catalog::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));

    let api_router = health::router()
        .merge(websocket::router())
        .merge(protected);

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
