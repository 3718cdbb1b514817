use serde::Serialize;
use utoipa::ToSchema;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    /// Open realtime sessions.
    pub sessions: usize,
}

impl HealthResponse {
    /// The store is reachable.
    pub fn ok(sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            sessions,
        }
    }

    /// The store is missing or failing; loops are paused.
    pub fn degraded(sessions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            sessions,
        }
    }
}
