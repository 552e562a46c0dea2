use axum::extract::{Extension, State};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::CreatorContext;
use crate::models::{CreateProduct, Product, UpdateProduct};

pub async fn create_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Json(input): Json<CreateProduct>,
) -> Result<Json<Product>> {
    if input.price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    if input.product_type.is_bookable() && input.duration_minutes.unwrap_or(0) <= 0 {
        return Err(AppError::BadRequest(
            "Bookable products need a positive duration".into(),
        ));
    }

    let conn = state.db.get()?;
    let product = queries::create_product(&conn, &ctx.creator.id, &input)?;
    Ok(Json(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
) -> Result<Json<Vec<Product>>> {
    let conn = state.db.get()?;
    let products = queries::list_products_for_creator(&conn, &ctx.creator.id)?;
    Ok(Json(products))
}

/// Load a product and enforce ownership. Cross-creator ids answer not-found
/// so existence is not leaked.
pub(super) fn owned_product(
    conn: &rusqlite::Connection,
    creator_id: &str,
    product_id: &str,
) -> Result<Product> {
    queries::get_product_by_id(conn, product_id)?
        .filter(|p| p.creator_id == creator_id)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let conn = state.db.get()?;
    let product = owned_product(&conn, &ctx.creator.id, &id)?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    let conn = state.db.get()?;
    owned_product(&conn, &ctx.creator.id, &id)?;
    queries::update_product(&conn, &id, &input)?;
    let product = owned_product(&conn, &ctx.creator.id, &id)?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    owned_product(&conn, &ctx.creator.id, &id)?;
    queries::delete_product(&conn, &id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
