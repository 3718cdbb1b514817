use std::time::SystemTime;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::team::{
        AddMemberRequest, CompletedGameView, CreateTeamRequest, LeaveTeamResponse,
        RegisterTeamRequest, RegistrationView, TeamView,
    },
    error::AppError,
    identity::Identity,
    services::team_service,
    state::SharedState,
};

/// Team management endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/teams", post(create_team))
        .route("/teams/me", get(my_team))
        .route("/teams/me/games", get(team_games))
        .route("/teams/leave", post(leave_team))
        .route("/teams/registrations", post(register_team))
        .route("/teams/{id}/members", post(add_member))
}

/// Create a team with the caller as creator.
#[utoipa::path(
    post,
    path = "/teams",
    tag = "teams",
    request_body = CreateTeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Team created", body = TeamView),
        (status = 409, description = "Name taken or caller already on a team")
    )
)]
pub async fn create_team(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamView>), AppError> {
    let team = team_service::create_team(&state, &identity, payload, SystemTime::now()).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// The caller's team.
#[utoipa::path(
    get,
    path = "/teams/me",
    tag = "teams",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's team", body = TeamView),
        (status = 404, description = "Caller has no team")
    )
)]
pub async fn my_team(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TeamView>, AppError> {
    Ok(Json(team_service::my_team(&state, &identity).await?))
}

/// Games the caller's team has finished.
#[utoipa::path(
    get,
    path = "/teams/me/games",
    tag = "teams",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Finished games with scores", body = [CompletedGameView]),
        (status = 404, description = "Caller has no team")
    )
)]
pub async fn team_games(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<CompletedGameView>>, AppError> {
    Ok(Json(team_service::team_games(&state, &identity).await?))
}

/// Add a team-less player to the caller's team.
#[utoipa::path(
    post,
    path = "/teams/{id}/members",
    tag = "teams",
    params(("id" = Uuid, Path, description = "Team identifier")),
    request_body = AddMemberRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated team", body = TeamView),
        (status = 401, description = "Caller is not the creator"),
        (status = 409, description = "Team full, playing, without creator, or player taken")
    )
)]
pub async fn add_member(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<TeamView>, AppError> {
    let team =
        team_service::add_member(&state, &identity, id, payload, SystemTime::now()).await?;
    Ok(Json(team))
}

/// Leave the caller's team.
#[utoipa::path(
    post,
    path = "/teams/leave",
    tag = "teams",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Left the team", body = LeaveTeamResponse),
        (status = 409, description = "Caller has no team")
    )
)]
pub async fn leave_team(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<LeaveTeamResponse>, AppError> {
    Ok(Json(team_service::leave_team(&state, &identity).await?))
}

/// Register the caller's team for a game.
#[utoipa::path(
    post,
    path = "/teams/registrations",
    tag = "teams",
    request_body = RegisterTeamRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Team registered", body = RegistrationView),
        (status = 401, description = "Caller is not the creator"),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Registration not allowed")
    )
)]
pub async fn register_team(
    State(state): State<SharedState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<RegisterTeamRequest>,
) -> Result<(StatusCode, Json<RegistrationView>), AppError> {
    let registration =
        team_service::register_team(&state, &identity, payload, SystemTime::now()).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}
