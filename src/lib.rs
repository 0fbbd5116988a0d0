// Library exports for DineSpot
// This allows integration tests and the client to use DineSpot modules

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod map;
pub mod places;
pub mod routes;
pub mod state;
pub mod validation;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface: pages, auth callback and the JSON API.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::pages::router())
        .merge(routes::auth::router())
        .merge(routes::posts::router())
        .merge(routes::restaurants::router())
        .merge(routes::profile::router())
        .merge(routes::places::router())
        .merge(routes::map::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
