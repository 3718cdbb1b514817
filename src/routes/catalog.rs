use std::time::SystemTime;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{CreateDefinitionRequest, DefinitionCreatedResponse, OpenDefinitionView},
    error::AppError,
    identity::Identity,
    services::catalog_service,
    state::SharedState,
};

/// Game definition listing for players and staff import/removal.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/definitions", get(open_definitions))
        .route("/admin/definitions", post(create_definition))
        .route("/admin/definitions/{id}", delete(delete_definition))
}

/// Accepted definitions still open for registration.
#[utoipa::path(
    get,
    path = "/definitions",
    tag = "catalog",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Open definitions, earliest first", body = [OpenDefinitionView])
    )
)]
pub async fn open_definitions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<OpenDefinitionView>>, AppError> {
    Ok(Json(
        catalog_service::open_definitions(&state, SystemTime::now()).await?,
    ))
}

/// Import an accepted game definition with its quests.
#[utoipa::path(
    post,
    path = "/admin/definitions",
    tag = "catalog",
    request_body = CreateDefinitionRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Definition imported", body = DefinitionCreatedResponse),
        (status = 400, description = "Invalid definition"),
        (status = 401, description = "Staff capability required")
    )
)]
pub async fn create_definition(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateDefinitionRequest>,
) -> Result<(StatusCode, Json<DefinitionCreatedResponse>), AppError> {
    let created = catalog_service::create_definition(&state, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a definition and every dependent row.
#[utoipa::path(
    delete,
    path = "/admin/definitions/{id}",
    tag = "catalog",
    params(("id" = Uuid, Path, description = "Definition identifier")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Definition deleted"),
        (status = 404, description = "Unknown definition")
    )
)]
pub async fn delete_definition(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_definition(&state, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
