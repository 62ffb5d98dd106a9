use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::SupervisorPolicy;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::identity::IdentityResolver;
use crate::jwt::TokenService;
use crate::routes::{auth, health, reports, users};
use crate::services::{AuthService, ReportService, UserService};
use crate::store::{ReportStore, SqliteReportStore, SqliteUserStore, UserStore};
use crate::utils::Argon2Verifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub identity: Arc<IdentityResolver>,
    pub auth: Arc<AuthService>,
    pub reports: Arc<ReportService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        Self::with_clock(pool, config, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let user_store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(pool.clone()));
        let report_store: Arc<dyn ReportStore> = Arc::new(SqliteReportStore::new(pool.clone()));

        let tokens = Arc::new(TokenService::with_clock(config.jwt, clock.clone()));
        let identity = Arc::new(IdentityResolver::new(config.auth_mode, tokens.clone(), user_store.clone()));

        let auth = AuthService::new(user_store.clone(), tokens, Arc::new(Argon2Verifier), identity.clone());
        let reports = ReportService::new(
            report_store,
            user_store.clone(),
            Arc::new(SupervisorPolicy::new()),
            clock.clone(),
        );
        let users = UserService::new(user_store, clock);

        Self {
            pool,
            identity,
            auth: Arc::new(auth),
            reports: Arc::new(reports),
            users: Arc::new(users),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    Ok(create_app_with_config(pool, config))
}

pub fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Router {
    router(AppState::new(pool, config))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/daily-reports", reports::routes())
        .nest("/users", users::routes())
        .route("/health", get(health::health));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
