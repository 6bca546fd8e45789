//! HTTP routes.

mod common;
mod records;

pub use common::{common_routes, common_routes_with_ready};
pub use records::record_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router: common routes at the root, schema and records under `/api`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api", record_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
