//! Read models for judges and players.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dto::{
        judging::{FinishedAttemptView, JudgeInfoResponse},
        quest::QuestMediaResponse,
    },
    error::ServiceError,
    identity::Identity,
    state::SharedState,
};

/// The judged team, the game and every finished attempt with its score, if any.
pub async fn judge_info(
    state: &SharedState,
    identity: &Identity,
    fix_judge_id: Uuid,
) -> Result<JudgeInfoResponse, ServiceError> {
    let store = state.require_store().await?;
    let judge = store
        .find_fix_judge(fix_judge_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("judge assignment `{fix_judge_id}` not found")))?;
    if judge.user_id != identity.user_id {
        return Err(ServiceError::Unauthorized(
            "only the assigned judge may read this assignment".into(),
        ));
    }

    let team = store.find_team(judge.team_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("team `{}` not found", judge.team_id))
    })?;
    let definition = store
        .find_game_definition(judge.game_def_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{}` not found", judge.game_def_id)))?;

    let mut attempts = Vec::new();
    if let Some(registration) = store
        .find_registration(judge.team_id, judge.game_def_id)
        .await?
    {
        let played = store.list_attempts(judge.team_id, registration.id).await?;
        let quests: HashMap<Uuid, Uuid> = played
            .iter()
            .map(|attempt| (attempt.id, attempt.quest_id))
            .collect();
        let finished = store
            .list_finished(played.iter().map(|attempt| attempt.id).collect())
            .await?;
        let scores: HashMap<Uuid, i32> = store
            .list_scores(finished.iter().map(|row| row.id).collect())
            .await?
            .into_iter()
            .map(|score| (score.game_finished_id, score.score))
            .collect();

        for row in finished {
            let task = match quests.get(&row.game_id) {
                Some(quest_id) => store
                    .find_quest(*quest_id)
                    .await?
                    .map(|quest| quest.task)
                    .unwrap_or_default(),
                None => String::new(),
            };
            attempts.push(FinishedAttemptView {
                game_finished_id: row.id,
                game_id: row.game_id,
                task,
                media_url: state.config().media_url(&row.media_ref),
                score: scores.get(&row.id).copied(),
            });
        }
    }

    Ok(JudgeInfoResponse {
        fix_judge_id: judge.id,
        team_id: team.id,
        team_name: team.name,
        game_def_id: definition.id,
        game_name: definition.name,
        attempts,
    })
}

/// Resolved media instructions of a quest.
pub async fn quest_media(
    state: &SharedState,
    quest_id: Uuid,
) -> Result<QuestMediaResponse, ServiceError> {
    let store = state.require_store().await?;
    let quest = store
        .find_quest(quest_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quest `{quest_id}` not found")))?;
    Ok(QuestMediaResponse {
        quest_id,
        media_url: state.config().media_url(&quest.media_ref),
    })
}
