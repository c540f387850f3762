mod dto;
mod handlers;

use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use mailharvest_core::config::CrawlConfig;
use mailharvest_fetch::PageFetcher;
use mailharvest_storage::Storage;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every route handler, mirroring the worker loop's
/// own `Storage`/`PageFetcher` pairing so `POST`/`PATCH` handlers can spawn a
/// Search Runner the same way the worker loop drives one.
pub struct AppState {
    pub storage: Storage,
    pub fetcher: Arc<PageFetcher>,
    pub crawl: CrawlConfig,
}

impl AppState {
    pub fn new(storage: Storage, fetcher: PageFetcher, crawl: CrawlConfig) -> Self {
        Self {
            storage,
            fetcher: Arc::new(fetcher),
            crawl,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/api/searches", post(handlers::create_search))
        .route("/api/searches", get(handlers::list_searches))
        .route("/api/searches/{id}", get(handlers::get_search))
        .route(
            "/api/searches/{id}/statistics",
            get(handlers::get_search_statistics),
        )
        .route(
            "/api/searches/{id}/domains",
            get(handlers::list_search_domains),
        )
        .route(
            "/api/searches/{id}/emails",
            get(handlers::list_search_emails),
        )
        .route(
            "/api/domains/{id}/emails",
            get(handlers::list_domain_emails),
        )
        .route("/api/searches/{id}/pause", patch(handlers::pause_search))
        .route("/api/searches/{id}/resume", patch(handlers::resume_search))
        .route("/api/searches/{id}", delete(handlers::cancel_search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
