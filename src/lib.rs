pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod scheduling;
pub mod util;

use axum::Router;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::AppState;

/// Assemble the full application router. Dev-only bootstrap routes are
/// mounted behind the flag so production builds never expose them.
pub fn app(state: AppState, dev_mode: bool) -> Router {
    let mut router = Router::new()
        .merge(handlers::public::router())
        .nest("/creators", handlers::creators::router(state.clone()));

    if dev_mode {
        router = router.route("/dev/creators", post(handlers::dev::create_dev_creator));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
