//! Scheduling of the three background loops.
//!
//! Each loop runs one pass, then idles for the configured tick interval. Passes are skipped
//! while the store is degraded, abandoned when they exceed the store timeout, and the loop
//! exits once a shutdown is requested.

use std::{fmt, time::SystemTime};

use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, error, info, warn};

use crate::{
    error::ServiceError,
    services::{current_game, judge_assignment, progression},
    state::SharedState,
};

/// The background loops of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameLoop {
    /// Elects judges.
    JudgeAssignment,
    /// Activates registrations.
    CurrentGame,
    /// Advances active games.
    Progression,
}

impl GameLoop {
    /// Every loop, in start order.
    pub const ALL: [GameLoop; 3] = [
        GameLoop::JudgeAssignment,
        GameLoop::CurrentGame,
        GameLoop::Progression,
    ];

    /// Run one pass at `now`, returning how many rows it touched.
    pub async fn tick(self, state: &SharedState, now: SystemTime) -> Result<usize, ServiceError> {
        match self {
            GameLoop::JudgeAssignment => Ok(judge_assignment::run_tick(state, now).await?.len()),
            GameLoop::CurrentGame => Ok(current_game::run_tick(state, now).await?.len()),
            GameLoop::Progression => Ok(progression::run_tick(state, now)
                .await?
                .iter()
                .filter(|step| {
                    step.outcome
                        .as_ref()
                        .is_ok_and(|outcome| *outcome != progression::Outcome::Waiting)
                })
                .count()),
        }
    }
}

impl fmt::Display for GameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameLoop::JudgeAssignment => "judge_assignment",
            GameLoop::CurrentGame => "current_game",
            GameLoop::Progression => "progression",
        })
    }
}

/// Spawn every loop on the runtime.
pub fn spawn_all(state: &SharedState) -> Vec<JoinHandle<()>> {
    GameLoop::ALL
        .into_iter()
        .map(|game_loop| tokio::spawn(run(state.clone(), game_loop)))
        .collect()
}

/// Drive `game_loop` until shutdown.
pub async fn run(state: SharedState, game_loop: GameLoop) {
    let interval = state.config().game.tick_interval;
    let limit = state.config().game.store_timeout;
    let mut shutdown = state.shutdown_watcher();
    info!(%game_loop, ?interval, "background loop started");

    loop {
        if state.is_shutting_down() {
            break;
        }

        if state.is_degraded() {
            debug!(%game_loop, "storage degraded; skipping pass");
        } else {
            match timeout(limit, game_loop.tick(&state, SystemTime::now())).await {
                Ok(Ok(0)) => {}
                Ok(Ok(changed)) => debug!(%game_loop, changed, "pass applied changes"),
                Ok(Err(ServiceError::Degraded)) => {
                    debug!(%game_loop, "storage went away during pass")
                }
                Ok(Err(err @ ServiceError::Invariant(_))) => {
                    error!(%game_loop, error = %err, "pass aborted on broken invariant")
                }
                Ok(Err(err)) => warn!(%game_loop, error = %err, "pass failed; retrying next tick"),
                Err(_) => warn!(%game_loop, ?limit, "pass timed out; retrying next tick"),
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    info!(%game_loop, "background loop stopped");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig, dao::quest_store::MemoryQuestStore, identity::StaticIdentityOracle,
        state::AppState,
    };

    #[tokio::test]
    async fn loop_exits_after_shutdown_request() {
        let mut config = AppConfig::default();
        config.game.tick_interval = Duration::from_millis(10);
        let state = AppState::with_store(
            config,
            Arc::new(StaticIdentityOracle::default()),
            Arc::new(MemoryQuestStore::new()),
        )
        .await;

        let handles = spawn_all(&state);
        state.request_shutdown();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("loop did not stop")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn degraded_state_reports_degraded_from_tick() {
        let state = AppState::new(AppConfig::default(), Arc::new(StaticIdentityOracle::default()));
        let err = GameLoop::Progression
            .tick(&state, SystemTime::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
