use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::models::Creator;
use crate::util::{extract_bearer_token, hash_api_key};

/// The authenticated creator, injected into request extensions for every
/// dashboard handler. Handlers still scope each query by `creator.id`.
#[derive(Clone)]
pub struct CreatorContext {
    pub creator: Creator,
}

pub async fn creator_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let api_key =
        extract_bearer_token(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let creator = queries::get_creator_by_api_key_hash(&conn, &hash_api_key(api_key))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(CreatorContext { creator });

    Ok(next.run(request).await)
}
