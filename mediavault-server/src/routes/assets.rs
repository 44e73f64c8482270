use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use mediavault_core::{
    AssetKey, AssetSummary, CheckInDecision, CheckOut, CheckOutMode, Identity, RelocateItem,
    RelocateVerdict,
};
use mediavault_store::ROOT_PREFIX;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub container: String,
    pub key: String,
    #[serde(default)]
    pub confirm_overwrite: bool,
}

#[derive(Deserialize)]
pub struct CheckOutRequest {
    pub container: String,
    pub key: String,
    #[serde(default = "default_mode")]
    pub mode: CheckOutMode,
}

fn default_mode() -> CheckOutMode {
    CheckOutMode::ReadOnly
}

#[derive(Deserialize)]
pub struct AssetRequest {
    pub container: String,
    pub key: String,
}

#[derive(Deserialize)]
pub struct RenamePair {
    pub source: String,
    pub destination: String,
}

/// Either explicit pairs or keys moved under a new prefix
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub container: String,
    #[serde(default)]
    pub items: Vec<RenamePair>,
    #[serde(default)]
    pub keys: Vec<String>,
    pub new_prefix: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub container: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

pub(crate) fn default_prefix() -> String {
    ROOT_PREFIX.to_string()
}

/// POST /upload
pub async fn check_in(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CheckInRequest>,
) -> ServerResult<Json<CheckInDecision>> {
    let key = AssetKey::new(req.container, req.key);
    let decision = state
        .vault
        .lifecycle
        .check_in(&identity, &key, req.confirm_overwrite)
        .await?;
    Ok(Json(decision))
}

/// POST /download
pub async fn check_out(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CheckOutRequest>,
) -> ServerResult<Json<CheckOut>> {
    let key = AssetKey::new(req.container, req.key);
    let grant = state
        .vault
        .lifecycle
        .check_out(&identity, &key, req.mode)
        .await?;
    Ok(Json(grant))
}

/// POST /delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AssetRequest>,
) -> ServerResult<Json<AssetSummary>> {
    let key = AssetKey::new(req.container, req.key);
    let removed = state.vault.lifecycle.delete(&identity, &key).await?;
    Ok(Json(removed))
}

/// POST /rename
pub async fn rename(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RenameRequest>,
) -> ServerResult<Json<Vec<RelocateVerdict>>> {
    let items = relocate_items(req)?;
    let verdicts = state.vault.lifecycle.relocate(&identity, items).await?;
    Ok(Json(verdicts))
}

fn relocate_items(req: RenameRequest) -> ServerResult<Vec<RelocateItem>> {
    let container = req.container;
    match (req.items.is_empty(), req.new_prefix) {
        (false, None) => Ok(req
            .items
            .into_iter()
            .map(|pair| RelocateItem {
                source: AssetKey::new(container.clone(), pair.source),
                destination: AssetKey::new(container.clone(), pair.destination),
            })
            .collect()),
        (true, Some(prefix)) => {
            let keys: Vec<AssetKey> = req
                .keys
                .into_iter()
                .map(|k| AssetKey::new(container.clone(), k))
                .collect();
            Ok(RelocateItem::under_prefix(&keys, &prefix))
        }
        _ => Err(ServerError::BadRequest(
            "Give either items or keys with newPrefix".into(),
        )),
    }
}

/// GET /assets?container=&prefix=
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<Vec<AssetSummary>>> {
    let assets = state
        .vault
        .lifecycle
        .list_assets(&identity, &query.container, &query.prefix)
        .await?;
    Ok(Json(assets))
}
