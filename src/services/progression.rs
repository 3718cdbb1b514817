//! Per-team progression: quest cursor, geofence, video-shooter election and completion.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            CompleteGameEntity, CurrentGameEntity, PlayerDataEntity, QuestAttemptEntity,
            VideoShooterEntity,
        },
        quest_store::QuestStore,
    },
    dto::ws::{QuestMarkView, ServerMessage},
    error::ServiceError,
    geo::{GeoPoint, intersect},
    services::{progress::TeamProgress, realtime},
    state::SharedState,
};

/// What one progression step did for a current game.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A completion record already existed; the current game was dropped.
    Closed,
    /// The deadline passed; the game was closed as not completed.
    Expired {
        /// Sum of the scores given before the deadline.
        score: i32,
    },
    /// Every quest was finished and scored.
    Completed {
        /// Final score.
        score: i32,
    },
    /// A new attempt was queued for the next quest.
    QuestQueued {
        /// Attempt created.
        attempt_id: Uuid,
    },
    /// A player reached the open quest; it is now visible.
    QuestRevealed {
        /// Attempt revealed.
        attempt_id: Uuid,
        /// Elected video-shooter, when one was created by this step.
        shooter: Option<Uuid>,
    },
    /// Nothing changed.
    Waiting,
}

/// Result of one step for one team.
#[derive(Debug)]
pub struct TeamStep {
    /// Team the step ran for.
    pub team_id: Uuid,
    /// What happened, or why the step failed.
    pub outcome: Result<Outcome, ServiceError>,
}

/// One pass of the progression loop.
///
/// A failure for one team is recorded in its [`TeamStep`] and does not stop the others.
pub async fn run_tick(state: &SharedState, now: SystemTime) -> Result<Vec<TeamStep>, ServiceError> {
    let store = state.require_store().await?;
    let mut steps = Vec::new();
    for current in store.list_current_games().await? {
        let outcome = step(state, &store, &current, now).await;
        if let Err(err) = &outcome {
            match err {
                ServiceError::Invariant(_) => {
                    error!(team_id = %current.team_id, error = %err, "progression invariant broken")
                }
                _ => warn!(team_id = %current.team_id, error = %err, "progression step failed"),
            }
        }
        steps.push(TeamStep {
            team_id: current.team_id,
            outcome,
        });
    }
    Ok(steps)
}

async fn step(
    state: &SharedState,
    store: &Arc<dyn QuestStore>,
    current: &CurrentGameEntity,
    now: SystemTime,
) -> Result<Outcome, ServiceError> {
    let (team_id, game_def_id) = (current.team_id, current.game_def_id);

    if store.find_complete_game(team_id, game_def_id).await?.is_some() {
        store.delete_current_game(team_id, game_def_id).await?;
        debug!(team_id = %team_id, game_def_id = %game_def_id, "closing completed game");
        return Ok(Outcome::Closed);
    }

    let definition = store
        .find_game_definition(game_def_id)
        .await?
        .ok_or_else(|| {
            ServiceError::Invariant(format!("current game references missing `{game_def_id}`"))
        })?;
    let progress = TeamProgress::load(store, team_id, game_def_id).await?;

    if definition.is_over(now) {
        let score = progress.total_score();
        finish(state, store, current, false, score).await?;
        info!(team_id = %team_id, game_def_id = %game_def_id, score, "game closed at deadline");
        return Ok(Outcome::Expired { score });
    }

    if progress.all_scored() {
        let score = progress.total_score();
        finish(state, store, current, true, score).await?;
        info!(team_id = %team_id, game_def_id = %game_def_id, score, "game completed");
        return Ok(Outcome::Completed { score });
    }

    let Some(open) = progress.open_attempt().cloned() else {
        let Some(quest_id) = progress.next_quest() else {
            return Ok(Outcome::Waiting);
        };
        let attempt = QuestAttemptEntity {
            id: Uuid::new_v4(),
            team_id,
            registration_id: progress.registration.id,
            quest_id,
            visible: false,
            created_at: now,
        };
        return match store.create_attempt(attempt.clone()).await {
            Ok(()) => {
                info!(team_id = %team_id, quest_id = %quest_id, attempt_id = %attempt.id, "quest queued");
                Ok(Outcome::QuestQueued {
                    attempt_id: attempt.id,
                })
            }
            Err(err) if err.is_conflict() => Ok(Outcome::Waiting),
            Err(err) => Err(err.into()),
        };
    };

    if open.visible {
        return Ok(Outcome::Waiting);
    }
    geofence(state, store, current, &open).await
}

/// Record the completion, drop the current game and tell the team.
async fn finish(
    state: &SharedState,
    store: &Arc<dyn QuestStore>,
    current: &CurrentGameEntity,
    completed: bool,
    score: i32,
) -> Result<(), ServiceError> {
    store
        .save_complete_game(CompleteGameEntity {
            id: Uuid::new_v4(),
            team_id: current.team_id,
            game_def_id: current.game_def_id,
            completed,
            score,
        })
        .await?;
    store
        .delete_current_game(current.team_id, current.game_def_id)
        .await?;
    realtime::emit_to_room(state, current.team_id, None, &ServerMessage::GameOver);
    Ok(())
}

async fn geofence(
    state: &SharedState,
    store: &Arc<dyn QuestStore>,
    current: &CurrentGameEntity,
    open: &QuestAttemptEntity,
) -> Result<Outcome, ServiceError> {
    let quest = store.find_quest(open.quest_id).await?.ok_or_else(|| {
        ServiceError::Invariant(format!("attempt `{}` references a missing quest", open.id))
    })?;
    let mark = store.find_mark(quest.mark_id).await?.ok_or_else(|| {
        ServiceError::Invariant(format!("quest `{}` references a missing mark", quest.id))
    })?;

    let judges: Vec<Uuid> = store
        .list_fix_judges_for_definition(current.game_def_id)
        .await?
        .into_iter()
        .map(|judge| judge.user_id)
        .collect();
    let members: Vec<PlayerDataEntity> = store
        .list_team_members(current.team_id)
        .await?
        .into_iter()
        .filter(|member| !judges.contains(&member.user_id))
        .filter(|member| state.sessions().is_user_connected(member.user_id))
        .collect();
    if members.is_empty() {
        return Ok(Outcome::Waiting);
    }

    let scale = state.geo_scale();
    let quest_area = scale.circle(GeoPoint::new(mark.lat, mark.lng), quest.radius_m);
    let player_radius = state.config().game.player_radius_m;

    let mut reached = false;
    for member in &members {
        let Some(coord) = store.find_coord(member.user_id).await? else {
            continue;
        };
        let player_area = scale.circle(GeoPoint::new(coord.lat, coord.lng), player_radius);
        if intersect(&player_area, &quest_area) {
            debug!(user_id = %member.user_id, attempt_id = %open.id, "player reached quest");
            reached = true;
            break;
        }
    }
    if !reached {
        return Ok(Outcome::Waiting);
    }

    let shooter = elect_shooter(state, store, open, &members).await?;
    if !store.reveal_attempt(open.id).await? {
        return Ok(Outcome::Waiting);
    }
    info!(team_id = %current.team_id, attempt_id = %open.id, "quest revealed");

    realtime::emit_to_room(
        state,
        current.team_id,
        None,
        &ServerMessage::SetViewCurrentQuest(QuestMarkView {
            lat: mark.lat,
            lng: mark.lng,
            radius: quest.radius_m,
        }),
    );
    realtime::emit_to_room(
        state,
        current.team_id,
        None,
        &ServerMessage::LoadMediaInstructions,
    );

    Ok(Outcome::QuestRevealed {
        attempt_id: open.id,
        shooter,
    })
}

/// Create the attempt's video-shooter unless one exists. Returns the elected user.
async fn elect_shooter(
    state: &SharedState,
    store: &Arc<dyn QuestStore>,
    open: &QuestAttemptEntity,
    members: &[PlayerDataEntity],
) -> Result<Option<Uuid>, ServiceError> {
    if store.find_video_shooter(open.id).await?.is_some() {
        return Ok(None);
    }
    let Some(index) = state.random_index(members.len()) else {
        return Ok(None);
    };
    let member = &members[index];
    let shooter = VideoShooterEntity {
        id: Uuid::new_v4(),
        game_id: open.id,
        player_data_id: member.id,
    };
    match store.create_video_shooter(shooter).await {
        Ok(()) => {
            info!(attempt_id = %open.id, user_id = %member.user_id, "video shooter elected");
            Ok(Some(member.user_id))
        }
        Err(err) if err.is_conflict() => Ok(None),
        Err(err) => Err(err.into()),
    }
}
