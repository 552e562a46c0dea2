use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateOrder, Order, OrderStatus, UploadSlip};
use crate::notify::OrderEvent;
use crate::orders::{self, CancelOutcome};

use super::storefront::{DayAvailability, PublicSlot};

/// Checkout answer: the created order plus where to send the transfer.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub order: Order,
    pub pay_to_promptpay: String,
}

pub async fn checkout(
    State(state): State<AppState>,
    Json(input): Json<CreateOrder>,
) -> Result<Json<CheckoutResponse>> {
    if input.buyer_name.trim().is_empty() || input.buyer_email.trim().is_empty() {
        return Err(AppError::BadRequest("Buyer name and email are required".into()));
    }

    let mut conn = state.db.get()?;
    let order = orders::create_order(&mut conn, &input).map_err(AppError::from)?;

    let pay_to_promptpay = queries::get_creator_by_id(&conn, &order.creator_id)?
        .and_then(|c| c.promptpay_id)
        .ok_or_else(|| AppError::Internal("creator lost promptpay during checkout".into()))?;

    state
        .notifier
        .order_event(OrderEvent::Created, &order.id, &order.creator_id, order.status);
    Ok(Json(CheckoutResponse {
        order,
        pay_to_promptpay,
    }))
}

/// Slip upload: pending_payment → pending_confirmation, then hand the slip
/// to the verification oracle when one is configured. A verified answer
/// confirms the order in the same request; anything else leaves it parked
/// for the creator to review.
pub async fn upload_slip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UploadSlip>,
) -> Result<Json<Order>> {
    let mut conn = state.db.get()?;
    let order = orders::attach_slip(&mut conn, &id, &input.slip_url).map_err(AppError::from)?;
    state
        .notifier
        .order_event(OrderEvent::SlipUploaded, &order.id, &order.creator_id, order.status);

    let Some(verifier) = &state.verifier else {
        return Ok(Json(order));
    };
    let promptpay = queries::get_creator_by_id(&conn, &order.creator_id)?
        .and_then(|c| c.promptpay_id);
    let Some(promptpay) = promptpay else {
        return Ok(Json(order));
    };

    let verdict = verifier.verify_slip(&input.slip_url, order.total, &promptpay).await;
    let order =
        orders::apply_verification(&mut conn, &order.id, &verdict).map_err(AppError::from)?;
    if order.status == OrderStatus::Confirmed {
        state
            .notifier
            .order_event(OrderEvent::Confirmed, &order.id, &order.creator_id, order.status);
    }
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CancelRequest>,
) -> Result<Json<Order>> {
    let mut conn = state.db.get()?;
    let reason = input.reason.as_deref().unwrap_or("cancelled by buyer");
    let order = match orders::cancel_order(&mut conn, &id, reason).map_err(AppError::from)? {
        CancelOutcome::Cancelled(order) => {
            state
                .notifier
                .order_event(OrderEvent::Cancelled, &order.id, &order.creator_id, order.status);
            order
        }
        CancelOutcome::AlreadyCancelled(order) => order,
    };
    Ok(Json(order))
}

pub async fn reschedule_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DayAvailability>>> {
    let conn = state.db.get()?;
    let order = queries::get_order_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let days = orders::reschedule_options(&conn, &order)
        .map_err(AppError::from)?
        .into_iter()
        .map(|(date, slots)| DayAvailability {
            date,
            slots: slots.iter().map(PublicSlot::from).collect(),
        })
        .collect();
    Ok(Json(days))
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub slot_id: String,
}

pub async fn reschedule_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RescheduleRequest>,
) -> Result<Json<Order>> {
    let mut conn = state.db.get()?;
    let order =
        orders::reschedule_order(&mut conn, &id, &input.slot_id).map_err(AppError::from)?;
    state
        .notifier
        .order_event(OrderEvent::Rescheduled, &order.id, &order.creator_id, order.status);
    Ok(Json(order))
}
