use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use mediavault_core::{CatalogCheck, Identity};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct BucketQuery {
    pub name: String,
}

#[derive(Deserialize)]
pub struct FolderRequest {
    pub container: String,
    pub key: String,
}

/// GET /bucket?name=
pub async fn validate_bucket(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Query(query): Query<BucketQuery>,
) -> ServerResult<Json<CatalogCheck>> {
    let check = state.vault.catalog.validate_container(&query.name).await?;
    Ok(Json(check))
}

/// POST /folder
pub async fn folder_check(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Json(req): Json<FolderRequest>,
) -> ServerResult<Json<CatalogCheck>> {
    let check = state
        .vault
        .catalog
        .can_create_folder(&req.container, &req.key)
        .await?;
    Ok(Json(check))
}
