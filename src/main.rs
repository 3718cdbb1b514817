//! GeoQuest Back binary entrypoint wiring REST, WebSocket, the game loops and storage.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geoquest_back::{
    config::{AppConfig, StoreSettings},
    dao::{
        quest_store::{MemoryQuestStore, QuestStore},
        storage::StorageError,
    },
    identity::build_identity,
    routes,
    services::{game_loops, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;
    let identity = build_identity(&config.identity).context("building identity oracle")?;
    let bind_address = config.bind_address;
    let store_settings = config.store.clone();

    let app_state = AppState::new(config, identity);

    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        connect_store(store_settings.clone())
    }));
    let loops = game_loops::spawn_all(&app_state);

    let app = build_router(app_state.clone());

    info!(addr = %bind_address, "starting server");
    let listener = TcpListener::bind(bind_address)
        .await
        .context("binding server")?;
    let service = app.into_make_service();
    let shutdown_state = app_state.clone();
    axum::serve(listener, service)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown requested");
            shutdown_state.request_shutdown();
        })
        .await
        .context("serving axum")?;

    for handle in loops {
        if let Err(err) = handle.await {
            warn!(error = %err, "game loop task ended abnormally");
        }
    }

    Ok(())
}

/// Open the configured storage backend.
async fn connect_store(settings: StoreSettings) -> Result<Arc<dyn QuestStore>, StorageError> {
    match settings {
        StoreSettings::Memory => {
            info!("using in-memory store; state is lost on restart");
            Ok(Arc::new(MemoryQuestStore::new()))
        }
        #[cfg(feature = "mongo-store")]
        StoreSettings::Mongo { uri, database } => {
            use geoquest_back::dao::quest_store::mongodb::{MongoConfig, MongoQuestStore};

            let config = MongoConfig::from_uri(&uri, database.as_deref()).await?;
            let store = MongoQuestStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        StoreSettings::Mongo { .. } => {
            warn!("MongoDB store configured but the `mongo-store` feature is disabled; using memory");
            Ok(Arc::new(MemoryQuestStore::new()))
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
