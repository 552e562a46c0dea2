use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::FulfillmentContent;
use crate::orders;

#[derive(Debug, Serialize)]
pub struct DownloadBody {
    pub content: FulfillmentContent,
    pub downloads_remaining: i32,
}

/// Token-gated download. File and redirect deliverables answer with a 307 to
/// the underlying URL; anything else comes back as JSON.
pub async fn access_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let conn = state.db.get()?;
    let grant = orders::grant_download(&conn, &token).map_err(AppError::from)?;

    let response = match grant.content {
        FulfillmentContent::DownloadFile { file_url } => {
            Redirect::temporary(&file_url).into_response()
        }
        FulfillmentContent::DownloadRedirect { redirect_url } => {
            Redirect::temporary(&redirect_url).into_response()
        }
        content => Json(DownloadBody {
            content,
            downloads_remaining: grant.remaining,
        })
        .into_response(),
    };
    Ok(response)
}
