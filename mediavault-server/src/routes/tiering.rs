use crate::error::ServerResult;
use crate::state::AppState;
use axum::{Extension, Json, extract::State};
use mediavault_core::{AssetKey, Identity, Tier, TieringDispatch, TieringRequest};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub container: String,
    pub keys: Vec<String>,
    pub target: Tier,
    pub target_host: String,
}

/// POST /move
pub async fn dispatch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<MoveRequest>,
) -> ServerResult<Json<TieringDispatch>> {
    let request = TieringRequest {
        keys: req
            .keys
            .into_iter()
            .map(|k| AssetKey::new(req.container.clone(), k))
            .collect(),
        target: req.target,
        target_host: req.target_host,
    };
    let dispatch = state.vault.tiering.dispatch(&identity, &request).await?;
    Ok(Json(dispatch))
}
