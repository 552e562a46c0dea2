mod downloads;
mod orders;
mod storefront;

pub use downloads::*;
pub use orders::*;
pub use storefront::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/stores/{creator_id}/products/{product_id}/slots",
            get(list_available_slots),
        )
        .route("/orders", post(checkout))
        .route("/orders/{id}/slip", post(upload_slip))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/reschedule-options", get(reschedule_options))
        .route("/orders/{id}/reschedule", post(reschedule_order))
        .route("/downloads/{token}", get(access_download))
}
