use crate::error::ServerResult;
use crate::routes::assets::ListQuery;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use mediavault_core::{FolderGrant, GroupSet, Identity};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct FolderPermissions {
    pub container: String,
    pub prefix: String,
    pub groups: GroupSet,
}

/// GET /folder/permissions?container=&prefix= (administrators only)
pub async fn get_permissions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<FolderPermissions>> {
    let groups = state
        .vault
        .authority
        .get_grant(&identity.groups, &query.container, &query.prefix)
        .await?;
    Ok(Json(FolderPermissions {
        container: query.container,
        prefix: query.prefix,
        groups,
    }))
}

/// POST /folder/permissions (administrators only)
pub async fn set_permissions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<FolderPermissions>,
) -> ServerResult<Json<FolderPermissions>> {
    state
        .vault
        .authority
        .set_grant(&identity.groups, &req.container, &req.prefix, &req.groups)
        .await?;
    Ok(Json(req))
}

/// GET /folders?container=&prefix=
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Json<Vec<FolderGrant>>> {
    let folders = state
        .vault
        .authority
        .visible_folders(&identity.groups, &query.container, &query.prefix)
        .await?;
    Ok(Json(folders))
}
