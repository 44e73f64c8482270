use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use mediavault_core::{AdminOperation, Identity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<String>,
}

#[derive(Deserialize)]
pub struct OperationQuery {
    pub operation: String,
}

/// GET /user/groups
///
/// Groups an administrator can hand out in grants; empty for everyone else.
pub async fn user_groups(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<GroupsResponse>> {
    let groups = state.vault.assignable_groups(&identity).await?;
    Ok(Json(GroupsResponse { groups }))
}

/// POST /admin?operation=
pub async fn operation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<OperationQuery>,
) -> ServerResult<Json<Value>> {
    let operation: AdminOperation = query.operation.parse()?;
    let result = state
        .vault
        .lifecycle
        .admin_operation(&identity, operation)
        .await?;
    Ok(Json(result))
}
