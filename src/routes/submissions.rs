use std::time::SystemTime;

use axum::{Extension, Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::submission::{AddResultRequest, AddResultResponse, SetScoreRequest, SetScoreResponse},
    error::AppError,
    identity::Identity,
    services::submission_service,
    state::SharedState,
};

/// Media and score submissions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/results", post(add_result))
        .route("/scores", post(set_score))
}

/// Submit the media answer of an open quest.
#[utoipa::path(
    post,
    path = "/results",
    tag = "submissions",
    request_body = AddResultRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Media accepted", body = AddResultResponse),
        (status = 401, description = "Caller is not the elected video shooter"),
        (status = 404, description = "No video shooter for this game"),
        (status = 409, description = "Media already submitted")
    )
)]
pub async fn add_result(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<AddResultRequest>,
) -> Result<(StatusCode, Json<AddResultResponse>), AppError> {
    let response =
        submission_service::add_result(&state, &identity, payload, SystemTime::now()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Score a finished quest attempt.
#[utoipa::path(
    post,
    path = "/scores",
    tag = "submissions",
    request_body = SetScoreRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Score recorded", body = SetScoreResponse),
        (status = 400, description = "Score out of range or attempt of another team"),
        (status = 401, description = "Caller is not the assigned judge"),
        (status = 404, description = "Unknown judge assignment or finished game"),
        (status = 409, description = "Already scored")
    )
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<SetScoreRequest>,
) -> Result<(StatusCode, Json<SetScoreResponse>), AppError> {
    let response = submission_service::set_score(&state, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
