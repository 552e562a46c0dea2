use axum::extract::{Extension, State};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::CreatorContext;
use crate::models::{Coupon, CreateCoupon, DiscountType, UpdateCoupon};

fn validate_discount(discount_type: DiscountType, value: i64) -> Result<()> {
    match discount_type {
        DiscountType::Percentage if !(1..=100).contains(&value) => Err(AppError::BadRequest(
            "Percentage discount must be between 1 and 100".into(),
        )),
        DiscountType::Fixed if value <= 0 => {
            Err(AppError::BadRequest("Fixed discount must be positive".into()))
        }
        _ => Ok(()),
    }
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Json(input): Json<CreateCoupon>,
) -> Result<Json<Coupon>> {
    if input.code.trim().is_empty() {
        return Err(AppError::BadRequest("Coupon code cannot be empty".into()));
    }
    validate_discount(input.discount_type, input.discount_value)?;

    let conn = state.db.get()?;
    let coupon = queries::create_coupon(&conn, &ctx.creator.id, &input)?;
    Ok(Json(coupon))
}

pub async fn list_coupons(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
) -> Result<Json<Vec<Coupon>>> {
    let conn = state.db.get()?;
    let coupons = queries::list_coupons_for_creator(&conn, &ctx.creator.id)?;
    Ok(Json(coupons))
}

fn owned_coupon(
    conn: &rusqlite::Connection,
    creator_id: &str,
    coupon_id: &str,
) -> Result<Coupon> {
    queries::get_coupon_by_id(conn, coupon_id)?
        .filter(|c| c.creator_id == creator_id)
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCoupon>,
) -> Result<Json<Coupon>> {
    let conn = state.db.get()?;
    let existing = owned_coupon(&conn, &ctx.creator.id, &id)?;
    if let Some(value) = input.discount_value {
        validate_discount(existing.discount_type, value)?;
    }
    queries::update_coupon(&conn, &id, &input)?;
    let coupon = owned_coupon(&conn, &ctx.creator.id, &id)?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    owned_coupon(&conn, &ctx.creator.id, &id)?;
    queries::delete_coupon(&conn, &id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
