//! Application-level configuration loading with environment overrides.

use std::{
    env, fs,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    capability::Capability,
    geo::{DEFAULT_DEGREE_DIVISOR, GeoScale},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GEOQUEST_BACK_CONFIG_PATH";
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Failure to produce a usable configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config `{path}`")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration JSON.
    #[error("failed to parse config `{path}`")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// An environment override could not be interpreted.
    #[error("invalid value `{value}` for environment variable `{var}`")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Storage backend selection.
pub enum StoreSettings {
    /// Process-local tables; state is lost on restart.
    Memory,
    /// MongoDB connection parameters.
    Mongo {
        /// Connection URI.
        uri: String,
        /// Database name; the backend default applies when absent.
        #[serde(default)]
        database: Option<String>,
    },
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::Mongo {
            uri: DEFAULT_MONGO_URI.to_owned(),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
/// Where bearer tokens are validated.
pub struct IdentitySettings {
    /// HTTP identity oracle endpoint. When absent the static token table is used.
    pub endpoint: Option<String>,
    /// Development token table.
    pub tokens: Vec<StaticToken>,
}

#[derive(Debug, Clone, Deserialize)]
/// One entry of the development token table.
pub struct StaticToken {
    /// Bearer token accepted for this user.
    pub token: String,
    /// User the token authenticates.
    pub user_id: Uuid,
    /// Flags granted to the user directly.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Flags granted through the user's group.
    #[serde(default)]
    pub group_capabilities: Vec<Capability>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Tuning of the background loops and geofence.
pub struct GameSettings {
    /// Idle time between two passes of each loop.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Radius of the circle drawn around a player, in metres.
    pub player_radius_m: f64,
    /// Metres per degree unit.
    pub degree_divisor: f64,
    /// Upper bound for one loop pass; the pass is abandoned when exceeded.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub store_timeout: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1_000),
            player_radius_m: 100.0,
            degree_divisor: DEFAULT_DEGREE_DIVISOR,
            store_timeout: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_address: SocketAddr,
    /// Storage backend.
    pub store: StoreSettings,
    /// Identity oracle.
    pub identity: IdentitySettings,
    /// Base URL prefixed to quest media references.
    pub media_endpoint: String,
    /// Loop and geofence tuning.
    pub game: GameSettings,
    /// Seed for the shared random generator; entropy is used when absent.
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreSettings::default(),
            identity: IdentitySettings::default(),
            media_endpoint: String::new(),
            game: GameSettings::default(),
            rng_seed: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration file and apply environment overrides.
    ///
    /// A missing file yields the built-in defaults; an unreadable or malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path();
        let mut config = Self::from_path(&path)?;
        config.apply_overrides(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Read the configuration at `path`, falling back to defaults when it does not exist.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_json_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse a configuration document.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Apply `PORT`/`SERVER_PORT`, `MONGO_URI`, `MONGO_DB`, `IDENTITY_ENDPOINT` and
    /// `MEDIA_ENDPOINT` using `lookup` to read variables.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some((var, value)) = ["PORT", "SERVER_PORT"]
            .into_iter()
            .find_map(|var| lookup(var).map(|value| (var, value)))
        {
            let port = value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidEnv { var, value })?;
            self.bind_address.set_port(port);
        }

        if let Some(uri) = lookup("MONGO_URI") {
            let database = match &self.store {
                StoreSettings::Mongo { database, .. } => database.clone(),
                StoreSettings::Memory => None,
            };
            self.store = StoreSettings::Mongo { uri, database };
        }
        if let Some(db) = lookup("MONGO_DB") {
            match &mut self.store {
                StoreSettings::Mongo { database, .. } => *database = Some(db),
                StoreSettings::Memory => {
                    warn!("MONGO_DB is set but the memory store is configured; ignoring")
                }
            }
        }
        if let Some(endpoint) = lookup("IDENTITY_ENDPOINT") {
            self.identity.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup("MEDIA_ENDPOINT") {
            self.media_endpoint = endpoint;
        }
        Ok(())
    }

    /// Scale converting metre radii into degree units.
    pub fn geo_scale(&self) -> GeoScale {
        GeoScale::new(self.game.degree_divisor)
    }

    /// Resolve a media reference against [`AppConfig::media_endpoint`].
    pub fn media_url(&self, media_ref: &str) -> String {
        if self.media_endpoint.is_empty() || media_ref.contains("://") {
            return media_ref.to_owned();
        }
        format!(
            "{}/{}",
            self.media_endpoint.trim_end_matches('/'),
            media_ref.trim_start_matches('/')
        )
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.game.tick_interval, Duration::from_millis(1_000));
        assert_eq!(config.game.player_radius_m, 100.0);
        assert_eq!(config.game.degree_divisor, 100_000.0);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn durations_are_read_as_milliseconds() {
        let config = AppConfig::from_json_str(
            r#"{"game": {"tick_interval": 250, "store_timeout": 1500}, "store": {"kind": "memory"}}"#,
        )
        .unwrap();
        assert_eq!(config.game.tick_interval, Duration::from_millis(250));
        assert_eq!(config.game.store_timeout, Duration::from_millis(1_500));
        assert_eq!(config.store, StoreSettings::Memory);
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_PORT", "9090"),
            ("MONGO_URI", "mongodb://db:27017"),
            ("MONGO_DB", "quests"),
            ("MEDIA_ENDPOINT", "https://media.example"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_overrides(|var| vars.get(var).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.bind_address.port(), 9090);
        assert_eq!(
            config.store,
            StoreSettings::Mongo {
                uri: "mongodb://db:27017".into(),
                database: Some("quests".into()),
            }
        );
        assert_eq!(config.media_url("/q/1.mp4"), "https://media.example/q/1.mp4");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|var| (var == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::from_path(Path::new("/nonexistent/geoquest.json")).unwrap();
        assert_eq!(config.store, StoreSettings::default());
    }
}
