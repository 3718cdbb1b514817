use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{judging::JudgeInfoResponse, quest::QuestMediaResponse},
    error::AppError,
    identity::Identity,
    services::judging_service,
    state::SharedState,
};

/// Judge and quest read endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/judging/{id}", get(judge_info))
        .route("/quests/{id}/media", get(quest_media))
}

/// Finished attempts awaiting the caller's judgement.
#[utoipa::path(
    get,
    path = "/judging/{id}",
    tag = "judging",
    params(("id" = Uuid, Path, description = "Judge assignment identifier")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Judge view", body = JudgeInfoResponse),
        (status = 401, description = "Caller is not the assigned judge"),
        (status = 404, description = "Unknown assignment")
    )
)]
pub async fn judge_info(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<JudgeInfoResponse>, AppError> {
    Ok(Json(judging_service::judge_info(&state, &identity, id).await?))
}

/// Media instructions of a quest.
#[utoipa::path(
    get,
    path = "/quests/{id}/media",
    tag = "judging",
    params(("id" = Uuid, Path, description = "Quest identifier")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Resolved media URL", body = QuestMediaResponse),
        (status = 404, description = "Unknown quest")
    )
)]
pub async fn quest_media(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestMediaResponse>, AppError> {
    Ok(Json(judging_service::quest_media(&state, id).await?))
}
