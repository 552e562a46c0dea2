use axum::extract::{Extension, State};
use tracing::info;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::CreatorContext;
use crate::models::{
    BookingSlot, CreateRecurringSlots, CreateSlot, CreateSlotWindow, Product, SlotBatchReport,
    UpdateSlot,
};
use crate::scheduling::{PlanError, plan_recurring, plan_single, plan_window};
use crate::util::now_store;

use super::products::owned_product;

fn bookable_product(
    conn: &rusqlite::Connection,
    creator_id: &str,
    product_id: &str,
) -> Result<Product> {
    let product = owned_product(conn, creator_id, product_id)?;
    if !product.product_type.is_bookable() {
        return Err(AppError::BadRequest(
            "Product does not take bookings".into(),
        ));
    }
    Ok(product)
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub async fn create_slot(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(product_id): Path<String>,
    Json(input): Json<CreateSlot>,
) -> Result<Json<SlotBatchReport>> {
    let mut conn = state.db.get()?;
    bookable_product(&conn, &ctx.creator.id, &product_id)?;

    let planned = plan_single(&input)?;
    let report = queries::insert_slots(&mut conn, &product_id, &ctx.creator.id, &[planned])?;
    Ok(Json(report))
}

pub async fn create_slot_window(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(product_id): Path<String>,
    Json(input): Json<CreateSlotWindow>,
) -> Result<Json<SlotBatchReport>> {
    let mut conn = state.db.get()?;
    bookable_product(&conn, &ctx.creator.id, &product_id)?;

    let planned = plan_window(&input)?;
    let report = queries::insert_slots(&mut conn, &product_id, &ctx.creator.id, &planned)?;
    info!(
        product_id = %product_id,
        requested = report.requested,
        inserted = report.inserted,
        "generated slot window"
    );
    Ok(Json(report))
}

pub async fn create_recurring_slots(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(product_id): Path<String>,
    Json(input): Json<CreateRecurringSlots>,
) -> Result<Json<SlotBatchReport>> {
    let mut conn = state.db.get()?;
    bookable_product(&conn, &ctx.creator.id, &product_id)?;

    let planned = plan_recurring(&input, now_store().date())?;
    let report = queries::insert_slots(&mut conn, &product_id, &ctx.creator.id, &planned)?;
    info!(
        product_id = %product_id,
        weeks = input.weeks,
        requested = report.requested,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "generated recurring slots"
    );
    Ok(Json(report))
}

pub async fn list_slots(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<BookingSlot>>> {
    let conn = state.db.get()?;
    owned_product(&conn, &ctx.creator.id, &product_id)?;
    let slots = queries::list_slots_for_product(&conn, &product_id)?;
    Ok(Json(slots))
}

fn owned_slot(
    conn: &rusqlite::Connection,
    creator_id: &str,
    slot_id: &str,
) -> Result<BookingSlot> {
    queries::get_slot_by_id(conn, slot_id)?
        .filter(|s| s.creator_id == creator_id)
        .ok_or_else(|| AppError::NotFound("Slot not found".into()))
}

pub async fn update_slot(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateSlot>,
) -> Result<Json<BookingSlot>> {
    let conn = state.db.get()?;
    owned_slot(&conn, &ctx.creator.id, &id)?;

    if let Some(available) = input.is_available {
        queries::set_slot_availability(&conn, &id, available)?;
    }
    if let Some(max_bookings) = input.max_bookings {
        if max_bookings < 1 {
            return Err(AppError::BadRequest("Capacity must be at least 1".into()));
        }
        if !queries::set_slot_capacity(&conn, &id, max_bookings)? {
            return Err(AppError::Conflict(
                "Capacity cannot drop below current reservations".into(),
            ));
        }
    }

    let slot = owned_slot(&conn, &ctx.creator.id, &id)?;
    Ok(Json(slot))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    owned_slot(&conn, &ctx.creator.id, &id)?;

    if !queries::delete_slot(&conn, &id)? {
        return Err(AppError::Conflict(
            "Slot has active reservations".into(),
        ));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
