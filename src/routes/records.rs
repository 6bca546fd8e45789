//! Schema and record routes, mounted under `/api`.

use crate::handlers::records::{create, list, read, update};
use crate::handlers::schema::describe;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn record_routes(state: AppState) -> Router {
    Router::new()
        .route("/schema", get(describe))
        .route("/records/:table", get(list).post(create))
        .route("/records/:table/:id", get(read).patch(update))
        .with_state(state)
}
