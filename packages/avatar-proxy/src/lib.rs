pub mod config;
pub mod handler;

use std::sync::Arc;

use avatar_core::{OriginGuard, UpstreamClient, UpstreamError};
use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub origin: Arc<OriginGuard>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        Ok(Self {
            origin: Arc::new(config.origin.clone()),
            upstream: UpstreamClient::new(config.origin.clone(), config.upstream)?,
        })
    }
}

pub fn router(state: AppState) -> Router {
    // span にはクエリ文字列（src）を含めない
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            let route = request
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str)
                .unwrap_or("-");
            tracing::info_span!("request", method = %request.method(), route = %route)
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(handler::health))
        .route("/api/proxy-avatar", get(handler::proxy_avatar))
        .route("/api/proxy-avatar/{user_id}", get(handler::proxy_user_avatar))
        .layer(CatchPanicLayer::custom(handler::handle_panic))
        .layer(trace)
        .with_state(state)
}
