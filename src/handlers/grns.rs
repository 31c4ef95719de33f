use super::common::{map_service_error, require_permission, success_response};
use crate::auth::permissions as perm;
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/grns",
    responses((status = 200, description = "All goods received notes, newest first")),
    tag = "grns"
)]
pub async fn list_grns(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_VIEW)?;
    let grns = state
        .services
        .procurement
        .list_grns()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(grns))
}

#[utoipa::path(
    get,
    path = "/api/v1/grns/{id}",
    params(("id" = Uuid, Path, description = "GRN ID")),
    responses(
        (status = 200, description = "GRN with lines", body = crate::services::procurement::GrnDetail),
        (status = 404, description = "GRN not found", body = crate::errors::ErrorResponse)
    ),
    tag = "grns"
)]
pub async fn get_grn(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_VIEW)?;
    let detail = state
        .services
        .procurement
        .get_grn(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

pub fn grn_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_grns))
        .route("/:id", get(get_grn))
}
