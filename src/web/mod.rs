//! HTTP surface

mod handlers;
mod templates;

pub use templates::Templates;

use crate::config::Settings;
use crate::search::Searcher;
use anyhow::Result;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub searcher: Arc<Searcher>,
    pub templates: Arc<Templates>,
}

impl AppState {
    pub fn new(settings: Settings, searcher: Searcher) -> Result<Self> {
        Ok(Self {
            settings: Arc::new(settings),
            searcher: Arc::new(searcher),
            templates: Arc::new(Templates::new()?),
        })
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/search",
            get(handlers::search).post(handlers::search_post),
        )
        .route(
            "/settings",
            get(handlers::settings).post(handlers::save_settings),
        )
        .route("/stats", get(handlers::stats))
        .route("/opensearch.xml", get(handlers::opensearch))
        .route("/robots.txt", get(handlers::robots_txt))
        .route("/css/style.css", get(handlers::stylesheet))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(15)))
        .with_state(state)
}
