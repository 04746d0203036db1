use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

pub mod admin;
pub mod auth;
mod catalog;
mod error;
mod journal;
mod newsletter;
mod observability;
mod validation;

pub use error::{ApiError, INVALID_CREDENTIALS_MESSAGE};

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn crate::services::auth_service::AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn audit(&self) -> &crate::services::audit::AuditService {
        &self.shared.audit
    }

    #[must_use]
    pub fn limiters(&self) -> &crate::security::AuthLimiters {
        &self.shared.limiters
    }

    #[must_use]
    pub fn event_bus(&self) -> &tokio::sync::broadcast::Sender<crate::domain::events::DomainEvent> {
        &self.shared.event_bus
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Stretches the configured secret into the 64 bytes `Key` requires.
/// Session cookies are signed with it, so a tampered cookie is dropped
/// instead of resolving to a session.
fn session_signing_key(secret: &str) -> tower_sessions::cookie::Key {
    use sha2::{Digest, Sha512};

    let digest = Sha512::digest(secret.as_bytes());
    tower_sessions::cookie::Key::from(digest.as_slice())
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config();
    let cors_origins = config.server.cors_allowed_origins.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.server.production)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_expiry_minutes,
        )))
        .with_signed(session_signing_key(&config.server.session_secret));

    let admin_routes = create_admin_router(state.clone());

    let api_router = Router::new()
        .route("/health", get(observability::health))
        .route("/auth/csrf-token", get(auth::get_csrf_token))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/auth/validate-reset-token",
            get(auth::validate_reset_token),
        )
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/verify-email", get(auth::verify_email))
        .route("/products", get(catalog::list_products))
        .route("/products/{id}", get(catalog::get_product))
        .route("/categories", get(catalog::list_categories))
        .route("/collections", get(catalog::list_collections))
        .route("/journal", get(journal::list_published))
        .route("/journal/{slug}", get(journal::get_by_slug))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/settings", get(admin::get_settings))
        .nest("/admin", admin_routes)
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(admin::list_admins))
        .route("/users", post(admin::create_admin))
        .route("/users/{id}", delete(admin::delete_admin))
        .route("/audit-logs", get(admin::audit_report))
        .route("/settings", put(admin::update_settings))
        .route("/products", post(catalog::create_product))
        .route("/products/{id}", put(catalog::update_product))
        .route("/products/{id}", delete(catalog::delete_product))
        .route("/categories", post(catalog::create_category))
        .route("/categories/{id}", delete(catalog::delete_category))
        .route("/collections", post(catalog::create_collection))
        .route("/collections/{id}", delete(catalog::delete_collection))
        .route("/journal", get(journal::list_all))
        .route("/journal", post(journal::create))
        .route("/journal/{id}", put(journal::update))
        .route("/journal/{id}", delete(journal::delete))
        .route("/subscribers", get(newsletter::list_subscribers))
        .route("/subscribers/{id}", delete(newsletter::delete_subscriber))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}
