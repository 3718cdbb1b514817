//! Media and score submissions.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameFinishedEntity, JudgeScoreEntity},
    dto::submission::{AddResultRequest, AddResultResponse, SetScoreRequest, SetScoreResponse},
    error::ServiceError,
    identity::Identity,
    state::SharedState,
};

/// Accept the media answer of an open attempt from its elected video-shooter.
///
/// The shooter row is checked before the caller, so a repeated submission reports the
/// missing shooter rather than an authorisation problem.
pub async fn add_result(
    state: &SharedState,
    identity: &Identity,
    request: AddResultRequest,
    now: SystemTime,
) -> Result<AddResultResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;
    let game_id = request.game_id;

    let shooter = store
        .find_video_shooter(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no video shooter for game `{game_id}`")))?;

    let caller = store.find_player(identity.user_id).await?;
    if caller.is_none_or(|player| player.id != shooter.player_data_id) {
        return Err(ServiceError::Unauthorized(
            "only the elected video shooter may submit media".into(),
        ));
    }

    let finished = GameFinishedEntity {
        id: Uuid::new_v4(),
        game_id,
        media_ref: request.media_ref.trim().to_owned(),
        finished_at: now,
    };
    // A concurrent submission for the same attempt won the insert.
    store.create_finished(finished.clone()).await.map_err(|err| {
        if err.is_conflict() {
            ServiceError::NotFound(format!("game `{game_id}` already has a result"))
        } else {
            err.into()
        }
    })?;
    store.take_video_shooter(game_id).await?;

    info!(game_id = %game_id, user_id = %identity.user_id, "media submitted");
    Ok(AddResultResponse {
        game_finished_id: finished.id,
        game_id,
    })
}

/// Record the assigned judge's score for a finished attempt of the judged team.
pub async fn set_score(
    state: &SharedState,
    identity: &Identity,
    request: SetScoreRequest,
) -> Result<SetScoreResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let judge = store
        .find_fix_judge(request.judge_fix_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("judge assignment `{}` not found", request.judge_fix_id))
        })?;
    if judge.user_id != identity.user_id {
        return Err(ServiceError::Unauthorized(
            "only the assigned judge may score".into(),
        ));
    }

    let finished = store
        .find_finished(request.game_finished_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "finished game `{}` not found",
                request.game_finished_id
            ))
        })?;
    let attempt = store.find_attempt(finished.game_id).await?.ok_or_else(|| {
        ServiceError::Invariant(format!(
            "finished row `{}` references a missing game",
            finished.id
        ))
    })?;
    let registration = store
        .find_registration(judge.team_id, judge.game_def_id)
        .await?;
    let belongs = attempt.team_id == judge.team_id
        && registration.is_some_and(|reg| reg.id == attempt.registration_id);
    if !belongs {
        return Err(ServiceError::InvalidInput(
            "finished game does not belong to the judged team".into(),
        ));
    }

    if !store.list_scores(vec![finished.id]).await?.is_empty() {
        return Err(ServiceError::InvalidState(format!(
            "finished game `{}` is already scored",
            finished.id
        )));
    }

    let score = JudgeScoreEntity {
        id: Uuid::new_v4(),
        game_finished_id: finished.id,
        fix_judge_id: judge.id,
        score: request.score,
    };
    store.create_score(score.clone()).await?;

    info!(
        game_finished_id = %finished.id,
        judge_id = %judge.id,
        score = score.score,
        "score recorded"
    );
    Ok(SetScoreResponse {
        judge_score_id: score.id,
        score: score.score,
    })
}
