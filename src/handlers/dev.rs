//! Dev-mode bootstrap endpoints. Mounted only when SELLIO_ENV=dev; never
//! exposed in production, where creators are provisioned via the CLI.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{CreateCreator, Creator, UpdateCreator};
use crate::util::{generate_token, hash_api_key};

#[derive(Debug, Deserialize)]
pub struct DevCreateCreator {
    pub email: String,
    pub store_name: String,
    #[serde(default)]
    pub promptpay_id: Option<String>,
    /// Publish immediately so the storefront can sell without a second call.
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Serialize)]
pub struct DevCreatorCreated {
    #[serde(flatten)]
    pub creator: Creator,
    /// Shown once; only the hash is stored.
    pub api_key: String,
}

pub async fn create_dev_creator(
    State(state): State<AppState>,
    Json(input): Json<DevCreateCreator>,
) -> Result<Json<DevCreatorCreated>> {
    let conn = state.db.get()?;

    let api_key = generate_token();
    let creator = queries::create_creator(
        &conn,
        &CreateCreator {
            email: input.email,
            store_name: input.store_name,
            promptpay_id: input.promptpay_id,
        },
        &hash_api_key(&api_key),
    )?;

    let creator = if input.publish {
        queries::update_creator(
            &conn,
            &creator.id,
            &UpdateCreator {
                store_name: None,
                promptpay_id: None,
                is_published: Some(true),
            },
        )?;
        queries::get_creator_by_id(&conn, &creator.id)?.unwrap_or(creator)
    } else {
        creator
    };

    tracing::info!(creator_id = %creator.id, "DEV: created test creator");
    Ok(Json(DevCreatorCreated { creator, api_key }))
}
