//! Route handlers.

pub mod search;
pub mod system;

use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;

/// Search routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search::search_events))
}
