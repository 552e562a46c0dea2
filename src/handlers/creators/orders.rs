use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::CreatorContext;
use crate::models::{Fulfillment, Order, Payment, RefundOrder, SetFulfillmentContent};
use crate::notify::OrderEvent;
use crate::orders::{self, CancelOutcome};

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payment: Option<Payment>,
    pub fulfillment: Option<Fulfillment>,
}

#[derive(Debug, Deserialize)]
pub struct RejectOrderRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

fn owned_order(
    conn: &rusqlite::Connection,
    creator_id: &str,
    order_id: &str,
) -> Result<Order> {
    queries::get_order_by_id(conn, order_id)?
        .filter(|o| o.creator_id == creator_id)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))
}

fn detail(conn: &rusqlite::Connection, order: Order) -> Result<OrderDetail> {
    let payment = queries::get_payment_by_order(conn, &order.id)?;
    let fulfillment = queries::get_fulfillment_by_order(conn, &order.id)?;
    Ok(OrderDetail {
        order,
        payment,
        fulfillment,
    })
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
) -> Result<Json<Vec<Order>>> {
    let conn = state.db.get()?;
    let orders = queries::list_orders_for_creator(&conn, &ctx.creator.id)?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let conn = state.db.get()?;
    let order = owned_order(&conn, &ctx.creator.id, &id)?;
    Ok(Json(detail(&conn, order)?))
}

pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let mut conn = state.db.get()?;
    owned_order(&conn, &ctx.creator.id, &id)?;

    let order = orders::confirm_order(&mut conn, &id).map_err(AppError::from)?;
    state
        .notifier
        .order_event(OrderEvent::Confirmed, &order.id, &order.creator_id, order.status);
    Ok(Json(detail(&conn, order)?))
}

pub async fn reject_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<RejectOrderRequest>,
) -> Result<Json<OrderDetail>> {
    let mut conn = state.db.get()?;
    owned_order(&conn, &ctx.creator.id, &id)?;

    let order = orders::reject_order(&mut conn, &id, &input.reason).map_err(AppError::from)?;
    state
        .notifier
        .order_event(OrderEvent::Rejected, &order.id, &order.creator_id, order.status);
    Ok(Json(detail(&conn, order)?))
}

pub async fn refund_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<RefundOrder>,
) -> Result<Json<OrderDetail>> {
    let mut conn = state.db.get()?;
    owned_order(&conn, &ctx.creator.id, &id)?;

    let order =
        orders::refund_order(&mut conn, &id, &input.refund_slip_url, input.note.as_deref())
            .map_err(AppError::from)?;
    state
        .notifier
        .order_event(OrderEvent::Refunded, &order.id, &order.creator_id, order.status);
    Ok(Json(detail(&conn, order)?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<CancelOrderRequest>,
) -> Result<Json<OrderDetail>> {
    let mut conn = state.db.get()?;
    owned_order(&conn, &ctx.creator.id, &id)?;

    let reason = input.reason.as_deref().unwrap_or("cancelled by creator");
    let order = match orders::cancel_order(&mut conn, &id, reason).map_err(AppError::from)? {
        CancelOutcome::Cancelled(order) => {
            state
                .notifier
                .order_event(OrderEvent::Cancelled, &order.id, &order.creator_id, order.status);
            order
        }
        CancelOutcome::AlreadyCancelled(order) => order,
    };
    Ok(Json(detail(&conn, order)?))
}

/// Fill in the meeting link, location, or access details the buyer receives.
/// Required before a booking or live order can be manually confirmed.
pub async fn set_fulfillment(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<SetFulfillmentContent>,
) -> Result<Json<Fulfillment>> {
    let conn = state.db.get()?;
    owned_order(&conn, &ctx.creator.id, &id)?;

    if !queries::set_fulfillment_content(&conn, &id, &input.content)? {
        return Err(AppError::NotFound("Order not found".into()));
    }
    let fulfillment = queries::get_fulfillment_by_order(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    Ok(Json(fulfillment))
}
