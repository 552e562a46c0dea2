mod coupons;
mod orders;
mod products;
mod profile;
mod slots;

pub use coupons::*;
pub use orders::*;
pub use products::*;
pub use profile::*;
pub use slots::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::creator_auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // Profile
        .route("/me", get(get_me))
        .route("/me", put(update_me))
        // Products
        .route("/products", post(create_product))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}", delete(delete_product))
        // Slots
        .route("/products/{id}/slots", post(create_slot))
        .route("/products/{id}/slots", get(list_slots))
        .route("/products/{id}/slots/window", post(create_slot_window))
        .route("/products/{id}/slots/recurring", post(create_recurring_slots))
        .route("/slots/{id}", put(update_slot))
        .route("/slots/{id}", delete(delete_slot))
        // Coupons
        .route("/coupons", post(create_coupon))
        .route("/coupons", get(list_coupons))
        .route("/coupons/{id}", put(update_coupon))
        .route("/coupons/{id}", delete(delete_coupon))
        // Orders
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/confirm", post(confirm_order))
        .route("/orders/{id}/reject", post(reject_order))
        .route("/orders/{id}/refund", post(refund_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/fulfillment", put(set_fulfillment))
        .layer(middleware::from_fn_with_state(state, creator_auth))
}
