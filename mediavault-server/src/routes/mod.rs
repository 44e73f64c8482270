use crate::middleware::{require_event_token, resolve_identity};
use crate::state::AppState;
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

mod admin;
mod assets;
mod catalog;
mod events;
mod folders;
mod health;
mod tiering;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/upload", post(assets::check_in))
        .route("/download", post(assets::check_out))
        .route("/delete", post(assets::delete))
        .route("/rename", post(assets::rename))
        .route("/assets", get(assets::list))
        .route("/move", post(tiering::dispatch))
        .route(
            "/folder/permissions",
            get(folders::get_permissions).post(folders::set_permissions),
        )
        .route("/folders", get(folders::list))
        .route("/folder", post(catalog::folder_check))
        .route("/bucket", get(catalog::validate_bucket))
        .route("/user/groups", get(admin::user_groups))
        .route("/admin", post(admin::operation))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_identity,
        ));

    let events = Router::new()
        .route("/events/object-created", post(events::object_created))
        .route("/events/object-removed", post(events::object_removed))
        .route(
            "/events/enrichment-complete",
            post(events::enrichment_complete),
        )
        .route("/events/tiering-complete", post(events::tiering_complete))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_event_token,
        ));

    let public = Router::new().route("/health", get(health::health_check));

    Router::new()
        .merge(protected)
        .merge(events)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
