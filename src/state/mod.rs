//! Process-wide shared state: the installed store, the session registry and the random
//! generator used for judge and video-shooter elections.

mod sessions;

use std::sync::{Arc, Mutex};

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::{RwLock, watch};
use tracing::{info, warn};

use crate::{
    config::AppConfig, dao::quest_store::QuestStore, error::ServiceError, geo::GeoScale,
    identity::IdentityOracle,
};

pub use self::sessions::{DepartedSession, RegistryError, SessionId, SessionRegistry};

/// Cheaply clonable handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state shared by the HTTP surface, the realtime sessions and the
/// background loops.
pub struct AppState {
    store: RwLock<Option<Arc<dyn QuestStore>>>,
    identity: Arc<dyn IdentityOracle>,
    sessions: SessionRegistry,
    config: Arc<AppConfig>,
    rng: Mutex<StdRng>,
    degraded: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Construct the state without a store. The application starts degraded until the
    /// storage supervisor installs one.
    pub fn new(config: AppConfig, identity: Arc<dyn IdentityOracle>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (shutdown_tx, _rx) = watch::channel(false);
        let rng = match config.rng_seed {
            Some(seed) => {
                info!(seed, "seeding random generator from configuration");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };
        Arc::new(Self {
            store: RwLock::new(None),
            identity,
            sessions: SessionRegistry::new(),
            config: Arc::new(config),
            rng: Mutex::new(rng),
            degraded: degraded_tx,
            shutdown: shutdown_tx,
        })
    }

    /// Construct the state with `store` already installed.
    pub async fn with_store(
        config: AppConfig,
        identity: Arc<dyn IdentityOracle>,
        store: Arc<dyn QuestStore>,
    ) -> SharedState {
        let state = Self::new(config, identity);
        state.set_store(store).await;
        state
    }

    /// Current store handle, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn QuestStore>> {
        self.store.read().await.as_ref().cloned()
    }

    /// Current store handle or [`ServiceError::Degraded`].
    pub async fn require_store(&self) -> Result<Arc<dyn QuestStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install `store` and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn QuestStore>) {
        *self.store.write().await = Some(store);
        self.update_degraded(false);
    }

    /// Drop the installed store and enter degraded mode.
    pub async fn clear_store(&self) {
        self.store.write().await.take();
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed && value {
            warn!("entering degraded mode");
        }
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of connected realtime sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Oracle validating bearer tokens.
    pub fn identity(&self) -> &Arc<dyn IdentityOracle> {
        &self.identity
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Metre to degree conversion used by the geofence.
    pub fn geo_scale(&self) -> GeoScale {
        self.config.geo_scale()
    }

    /// Draw a uniform index in `0..len`, or `None` for an empty pool.
    ///
    /// The generator lock is released before returning and never spans an await.
    pub fn random_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(rng.random_range(0..len))
    }

    /// Ask the background loops to stop after their current pass.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether a graceful stop was requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Subscribe to the shutdown flag.
    pub fn shutdown_watcher(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::quest_store::MemoryQuestStore, identity::StaticIdentityOracle};

    fn config(seed: u64) -> AppConfig {
        AppConfig {
            rng_seed: Some(seed),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn state_is_degraded_until_a_store_is_installed() {
        let state = AppState::new(config(1), Arc::new(StaticIdentityOracle::default()));
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_store(Arc::new(MemoryQuestStore::new())).await;
        assert!(!state.is_degraded());
        assert!(state.require_store().await.is_ok());

        state.clear_store().await;
        assert!(state.is_degraded());
    }

    #[test]
    fn seeded_generators_draw_the_same_sequence() {
        let a = AppState::new(config(7), Arc::new(StaticIdentityOracle::default()));
        let b = AppState::new(config(7), Arc::new(StaticIdentityOracle::default()));
        let draws_a: Vec<_> = (0..8).map(|_| a.random_index(5)).collect();
        let draws_b: Vec<_> = (0..8).map(|_| b.random_index(5)).collect();
        assert_eq!(draws_a, draws_b);
        assert!(draws_a.iter().all(|idx| idx.is_some_and(|i| i < 5)));
        assert_eq!(a.random_index(0), None);
    }

    #[test]
    fn shutdown_flag_is_observable() {
        let state = AppState::new(config(1), Arc::new(StaticIdentityOracle::default()));
        let watcher = state.shutdown_watcher();
        assert!(!state.is_shutting_down());
        state.request_shutdown();
        assert!(state.is_shutting_down());
        assert!(*watcher.borrow());
    }
}
