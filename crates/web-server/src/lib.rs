use axum::{
    routing::get,
    Router,
};
use configuration::settings::{Config, DatabaseSettings};
use database::memory::InMemoryConnection;
use database::{Context, MongoConnection, SpellRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub spells: SpellRepository,
    /// Deadline given to each request's store operations.
    pub operation_timeout: Option<Duration>,
}

impl AppState {
    /// A fresh per-request context. Dropping the request future (client gone)
    /// drops the store call with it.
    pub fn context(&self) -> Context {
        match self.operation_timeout {
            Some(timeout) => Context::background().with_timeout(timeout),
            None => Context::background(),
        }
    }
}

/// Builds the application router over an already-connected repository.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/spells",
            get(handlers::get_spells)
                .post(handlers::add_spell)
                .delete(handlers::delete_spell),
        )
        .with_state(Arc::new(state))
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Serves `state` on `addr` until Ctrl+C.
pub async fn run_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "Failed to listen for shutdown signal.");
            }
        })
        .await?;

    Ok(())
}

/// URIs with this scheme select the in-process store instead of MongoDB.
pub const MEMORY_URI_SCHEME: &str = "memory://";

/// The spell repository together with whatever connection backs it.
pub struct Store {
    pub spells: SpellRepository,
    mongo: Option<MongoConnection>,
}

impl Store {
    /// Opens the store named by `settings.uri`. A `memory://` URI yields an
    /// empty in-process store; anything else is handed to the MongoDB driver.
    pub async fn open(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        if settings.uri.starts_with(MEMORY_URI_SCHEME) {
            tracing::warn!("Using the in-memory store; nothing will be persisted.");
            return Ok(Self {
                spells: SpellRepository::new(Arc::new(InMemoryConnection::new())),
                mongo: None,
            });
        }

        let connection =
            database::connect_with(&settings.uri, settings.server_selection_timeout()).await?;
        Ok(Self {
            spells: SpellRepository::new(Arc::new(connection.clone())),
            mongo: Some(connection),
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.mongo.is_none()
    }

    /// Shuts the driver connection down, if there is one.
    pub async fn close(self) {
        if let Some(connection) = self.mongo {
            connection.shutdown().await;
        }
    }
}

/// Opens the store described by `config`, serves until shutdown, then
/// tears the connection down.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Store::open(&config.database).await?;

    let state = AppState {
        spells: store.spells.clone(),
        operation_timeout: config.database.operation_timeout(),
    };

    let addr = config
        .server
        .socket_addr()
        .ok_or_else(|| anyhow::anyhow!("invalid listen address {}", config.server.host))?;

    let served = run_server(addr, state).await;
    store.close().await;
    served
}
