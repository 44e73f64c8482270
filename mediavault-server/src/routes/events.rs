use crate::error::ServerResult;
use crate::state::AppState;
use axum::{Json, extract::State};
use mediavault_core::{
    AssetSummary, CommandStatus, IngestOutcome, ObjectEvent, TieringReconciliation,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct RemovedEvent {
    pub container: String,
    pub key: String,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub revoked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentEvent {
    pub job_id: String,
}

#[derive(Serialize)]
pub struct EnrichmentResponse {
    pub updated: Option<AssetSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieringEvent {
    pub command_id: String,
    pub target_host: String,
    pub status: CommandStatus,
}

/// POST /events/object-created
pub async fn object_created(
    State(state): State<AppState>,
    Json(event): Json<ObjectEvent>,
) -> ServerResult<Json<IngestOutcome>> {
    let outcome = state.vault.ingest.object_created(&event).await?;
    Ok(Json(outcome))
}

/// POST /events/object-removed
pub async fn object_removed(
    State(state): State<AppState>,
    Json(event): Json<RemovedEvent>,
) -> ServerResult<Json<RemovedResponse>> {
    let revoked = state
        .vault
        .ingest
        .object_removed(&event.container, &event.key)
        .await?;
    Ok(Json(RemovedResponse { revoked }))
}

/// POST /events/enrichment-complete
pub async fn enrichment_complete(
    State(state): State<AppState>,
    Json(event): Json<EnrichmentEvent>,
) -> ServerResult<Json<EnrichmentResponse>> {
    let updated = state
        .vault
        .ingest
        .enrichment_completed(&event.job_id)
        .await?
        .map(|record| record.summary());
    Ok(Json(EnrichmentResponse { updated }))
}

/// POST /events/tiering-complete
pub async fn tiering_complete(
    State(state): State<AppState>,
    Json(event): Json<TieringEvent>,
) -> ServerResult<Json<TieringReconciliation>> {
    let outcome = state
        .vault
        .tiering
        .reconcile_command(&event.command_id, &event.target_host, event.status)
        .await?;
    Ok(Json(outcome))
}
