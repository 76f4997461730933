#![forbid(unsafe_code)]

//! HTTP service recording barbershop branch checklists into Google Sheets.
//! Routing, the response cache and the branch directory live here; the
//! remote spreadsheet protocol is `barberboard-sheets`, pure domain rules
//! are `barberboard-model`.

mod cache;
mod config;
mod directory;
mod ensure;
mod http;
mod summary;
mod writer;

pub use cache::{CacheKey, CacheView, ResponseCache};
pub use config::{validate_startup_config_contract, ServiceConfig, CONFIG_SCHEMA_VERSION};
pub use directory::Directory;
pub use ensure::ensure_sheet;
pub use summary::summarize;
pub use writer::{append_category_records, append_summary_rows, lenient_records};

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use barberboard_sheets::SheetsBackend;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CRATE_NAME: &str = "barberboard-server";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub backend: Arc<dyn SheetsBackend>,
    pub cache: Arc<ResponseCache>,
    pub directory: Arc<Directory>,
    pub request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServiceConfig, backend: Arc<dyn SheetsBackend>) -> Self {
        let cache = Arc::new(ResponseCache::new(config.cache_ttl));
        let directory = Arc::new(Directory::new(
            backend.clone(),
            cache.clone(),
            config.master_sheet_id.clone(),
            config.drive_folder_id.clone(),
            config.grant_email.clone(),
        ));
        // Odd nanosecond seed keeps generated request ids distinct across
        // restarts without any shared counter.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(1)
            | 1;
        Self {
            config: Arc::new(config),
            backend,
            cache,
            directory,
            request_id_seed: Arc::new(AtomicU64::new(seed)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;
    Router::new()
        .route("/", get(http::handlers::landing))
        .route("/health", get(http::handlers::health))
        .route("/register", post(http::handlers::register))
        .route("/login", post(http::handlers::login))
        .route(
            "/dashboard-summary/:branch",
            get(http::handlers::dashboard_get).post(http::handlers::dashboard_post),
        )
        .route(
            "/branch-summary/:branch",
            get(http::handlers::branch_summary_get).post(http::handlers::branch_summary_post),
        )
        .route("/api/cache-stats", get(http::handlers::cache_stats))
        .route("/api/cache-clear", post(http::handlers::cache_clear_all))
        .route(
            "/api/cache-clear/:branch",
            post(http::handlers::cache_clear_branch),
        )
        .route(
            "/:category/:branch",
            get(http::handlers::category_records).post(http::handlers::category_submit),
        )
        .fallback(http::fallback_handler)
        .layer(from_fn_with_state(state.clone(), http::request_log_middleware))
        .layer(from_fn_with_state(state.clone(), http::cors_middleware))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use barberboard_sheets::FakeSheets;

    // Route table conflicts panic inside the router builder, so building it
    // once is the whole test.
    #[tokio::test]
    async fn router_builds_without_route_conflicts() {
        let state = AppState::new(ServiceConfig::default(), Arc::new(FakeSheets::default()));
        let _router = build_router(state);
    }

    #[tokio::test]
    async fn app_state_shares_one_cache_with_the_directory() {
        let state = AppState::new(ServiceConfig::default(), Arc::new(FakeSheets::default()));
        assert_eq!(state.cache.entry_count().await, 0);
        assert_eq!(Arc::strong_count(&state.cache), 2);
    }
}
