use axum::{routing::{get, post}, Router};
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use crate::auth::AdminSecret;
use crate::config::{AppConfig, StoreBackend, decode_cookie_key};
use crate::ledger::QuotaLedger;
use crate::repos::{CredentialStore, ProfileStore};
use crate::web::handlers;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cookie_key: Key,
    pub admin: Arc<AdminSecret>,
    pub tokens: Arc<dyn CredentialStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub ledger: QuotaLedger,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        cookie_key: Key,
        tokens: Arc<dyn CredentialStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let admin = Arc::new(AdminSecret::from_config(&config.auth));
        let ledger = QuotaLedger::new(tokens.clone(), profiles.clone());
        Self { config, cookie_key, admin, tokens, profiles, ledger }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // logging
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();

    let config = AppConfig::load()?;
    tracing::info!(?config, "loaded config");
    let key_bytes = decode_cookie_key(&config.server.cookie_key_base64)?;
    let cookie_key = Key::from(&key_bytes);

    let (tokens, profiles) = build_stores(&config)?;
    let state = AppState::new(config.clone(), cookie_key, tokens, profiles);

    let app = build_router(state);

    let addr = config.server.bind_addr.clone();
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

type Stores = (Arc<dyn CredentialStore>, Arc<dyn ProfileStore>);

/// Pick the store backend named by the config.
pub fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.db.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory stores; access codes are lost on restart");
            let tokens: Arc<dyn CredentialStore> = crate::repos::memory::MemoryCredentialStore::new();
            let profiles: Arc<dyn ProfileStore> = crate::repos::memory::MemoryProfileStore::new();
            Ok((tokens, profiles))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let pool = crate::db::sqlite::make_pool(&config.db.url)?;
            // Run migrations eagerly on startup
            let mut conn = pool.get()?;
            crate::db::migrations::run_sqlite_migrations(&mut conn)?;
            drop(conn);
            let tokens: Arc<dyn CredentialStore> = crate::repos::sqlite::SqliteCredentialStore::new(pool.clone());
            let profiles: Arc<dyn ProfileStore> = crate::repos::sqlite::SqliteProfileStore::new(pool);
            Ok((tokens, profiles))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => anyhow::bail!("built without the `sqlite` feature"),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route("/api/quota/{action}", post(handlers::quota::consume))
        .route(
            "/api/admin/tokens",
            get(handlers::admin::list_tokens).post(handlers::admin::issue_tokens),
        )
        .route("/api/admin/tokens/{id}/disable", post(handlers::admin::disable_token))
        .route(
            "/api/admin/flags/{key}",
            get(handlers::admin::get_flag).put(handlers::admin::put_flag),
        )
        .route("/api/admin/profiles/{email}/tier", post(handlers::admin::set_tier))
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}
