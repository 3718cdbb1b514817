use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the store and report whether the engine is running or degraded.
///
/// A failed store check is logged; flipping the degraded flag is left to the storage supervisor.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let sessions = state.sessions().len();
    let healthy = match state.store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        None => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    if healthy && !state.is_degraded() {
        HealthResponse::ok(sessions)
    } else {
        HealthResponse::degraded(sessions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::quest_store::MemoryQuestStore, identity::StaticIdentityOracle,
        state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_without_store() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticIdentityOracle::default()));
        assert_eq!(health_status(&state).await.status, "degraded");

        state.set_store(Arc::new(MemoryQuestStore::new())).await;
        let response = health_status(&state).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.sessions, 0);
    }
}
