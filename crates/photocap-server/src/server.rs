use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use photocap_auth::JwtService;
use photocap_db_postgres::PostgresStore;
use photocap_storage::DynPrimaryStore;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::{CacheBackend, Invalidator, ReadThroughCache, TokenStore};
use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::extractors::AuthState;
use crate::{handlers, metrics, middleware as app_middleware};

/// Shared application state.
///
/// Every cache component holds a clone of the same [`CacheBackend`], which is
/// created once at startup and closed once at shutdown.
#[derive(Clone)]
pub struct AppState {
    pub store: DynPrimaryStore,
    pub cache: CacheBackend,
    pub views: ReadThroughCache,
    pub tokens: TokenStore,
    pub invalidator: Invalidator,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(store: DynPrimaryStore, cache: CacheBackend, cfg: &AppConfig) -> Self {
        Self {
            views: ReadThroughCache::new(cache.clone(), cfg.cache.entity_ttl(), cfg.cache.on_error),
            tokens: TokenStore::new(cache.clone(), cfg.cache.token_ttl()),
            invalidator: Invalidator::new(cache.clone()),
            jwt: Arc::new(JwtService::new(
                cfg.auth.jwt_secret.as_bytes(),
                cfg.cache.token_ttl_secs,
            )),
            store,
            cache,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState {
            jwt: state.jwt.clone(),
            tokens: state.tokens.clone(),
        }
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        // Users
        .route(
            "/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route("/users/login", post(handlers::users::login))
        .route("/users/logout", post(handlers::users::logout))
        .route(
            "/users/{id}",
            get(handlers::users::read)
                .put(handlers::users::update)
                .delete(handlers::users::delete),
        )
        // Photos
        .route(
            "/photos",
            get(handlers::photos::list).post(handlers::photos::create),
        )
        .route(
            "/photos/{id}",
            get(handlers::photos::read)
                .put(handlers::photos::update)
                .delete(handlers::photos::delete),
        )
        // Captions
        .route("/captions", post(handlers::captions::create))
        .route(
            "/captions/{id}",
            get(handlers::captions::read)
                .put(handlers::captions::update)
                .delete(handlers::captions::delete),
        )
        .fallback(handlers::fallback)
        .with_state(state)
        // Middleware stack, innermost first. The request id runs before the
        // trace layer so the span can carry it.
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span::<axum::body::Body>)
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

fn request_span<B>(req: &axum::http::Request<B>) -> tracing::Span {
    let req_id = req
        .headers()
        .get(&app_middleware::REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::info_span!(
        "http.request",
        http.method = %req.method(),
        http.target = %req.uri(),
        http.status_code = tracing::field::Empty,
        request_id = %req_id
    )
}

/// Opens the configured primary store.
pub async fn create_store(cfg: &StorageConfig) -> anyhow::Result<DynPrimaryStore> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory primary store; data will not persist");
            Ok(photocap_db_memory::create_primary_store())
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::new(cfg.postgres.to_postgres_config())
                .await
                .context("failed to open PostgreSQL store")?;
            Ok(Arc::new(store))
        }
    }
}

/// How often the in-process cache drops expired entries.
const LOCAL_CACHE_SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(60);

pub struct PhotocapServer {
    addr: SocketAddr,
    app: Router,
    cache: CacheBackend,
    sweeper: Option<tokio::task::JoinHandle<()>>,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynPrimaryStore>,
    cache: Option<CacheBackend>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
            cache: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `store` instead of opening the configured one.
    pub fn with_store(mut self, store: DynPrimaryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `cache` instead of connecting to the configured one.
    pub fn with_cache(mut self, cache: CacheBackend) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Opens the store and the cache and assembles the router.
    ///
    /// Fails if the configuration is invalid or either dependency is
    /// unreachable.
    pub async fn build(self) -> anyhow::Result<PhotocapServer> {
        self.config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

        let store = match self.store {
            Some(store) => store,
            None => create_store(&self.config.storage).await?,
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None => CacheBackend::connect(&self.config.redis)
                .await
                .context("failed to connect to cache")?,
        };

        metrics::init_metrics();
        tracing::info!(
            store = store.backend_name(),
            cache = cache.mode(),
            on_error = ?self.config.cache.on_error,
            "server initialized"
        );

        let sweeper = cache.spawn_sweeper(LOCAL_CACHE_SWEEP_PERIOD);
        let state = AppState::new(store, cache.clone(), &self.config);
        let app = build_app(state, &self.config);

        Ok(PhotocapServer {
            addr: self.addr,
            app,
            cache,
            sweeper,
        })
    }
}

impl PhotocapServer {
    /// Serves until Ctrl+C / SIGTERM, drains in-flight requests, then closes
    /// the cache connection.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }
        self.cache.disconnect();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
