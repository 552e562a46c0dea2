use axum::extract::{Extension, State};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::CreatorContext;
use crate::models::{Creator, UpdateCreator};

pub async fn get_me(Extension(ctx): Extension<CreatorContext>) -> Result<Json<Creator>> {
    Ok(Json(ctx.creator))
}

/// Store profile updates, including the publish toggle. Publishing without a
/// PromptPay id is allowed but the storefront stays closed until one is set.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<CreatorContext>,
    Json(input): Json<UpdateCreator>,
) -> Result<Json<Creator>> {
    let conn = state.db.get()?;
    queries::update_creator(&conn, &ctx.creator.id, &input)?;
    let creator = queries::get_creator_by_id(&conn, &ctx.creator.id)?
        .ok_or_else(|| AppError::NotFound("Creator not found".into()))?;
    Ok(Json(creator))
}
