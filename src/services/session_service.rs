//! Handlers for realtime session events.
//!
//! Handlers keep no state of their own: every event rereads the store and answers with the
//! caller's current view. Apart from player coordinates they never mutate game progress.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    capability::Capabilities,
    dao::models::{PlayerCoordEntity, PlayerDataEntity},
    dto::ws::{
        AuthenticationPayload, ClientMessage, CommandStatusPayload, CoordinatesPayload,
        DisconnectPayload, JudgeAssignmentView, PositionView, QuestMarkView, QuestView,
        ServerMessage, StatusPayload,
    },
    error::ServiceError,
    services::{
        progress::{TeamProgress, active_judges},
        realtime::{emit_to_room, emit_to_session},
    },
    state::{SessionId, SharedState},
};

/// Dispatch one validated client event.
pub async fn handle_event(
    state: &SharedState,
    session_id: SessionId,
    message: ClientMessage,
    now: SystemTime,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::Authentication(payload) => {
            authenticate(state, session_id, payload, now).await
        }
        ClientMessage::Status => status(state, session_id, now).await,
        ClientMessage::CommandStatus => command_status(state, session_id).await,
        ClientMessage::SetPlayerCoordinates(payload) => {
            set_player_coordinates(state, session_id, payload).await
        }
        ClientMessage::CoordinatesPlayers => coordinates_players(state, session_id).await,
        ClientMessage::SetCurrentCoordinates(payload) => {
            set_current_coordinates(state, session_id, payload, now).await
        }
        ClientMessage::GetMyCoordinates => get_my_coordinates(state, session_id).await,
    }
}

fn session_user(state: &SharedState, session_id: SessionId) -> Result<Uuid, ServiceError> {
    state
        .sessions()
        .user_of(session_id)
        .ok_or_else(|| ServiceError::Unauthorized("session is not authenticated".into()))
}

fn emit(state: &SharedState, session_id: SessionId, message: ServerMessage) {
    if !emit_to_session(state, session_id, &message) {
        debug!(session = %session_id, "session gone before event could be queued");
    }
}

/// Bind the session to the user validated at handshake.
///
/// Players get a profile on first authentication so they can be elected as judges.
pub async fn authenticate(
    state: &SharedState,
    session_id: SessionId,
    payload: AuthenticationPayload,
    now: SystemTime,
) -> Result<(), ServiceError> {
    let user_id = payload.users_id;
    if let Err(err) = state.sessions().authenticate(session_id, user_id) {
        debug!(session = %session_id, error = %err, "authentication refused");
        emit(state, session_id, ServerMessage::AuthenticationFailed);
        return Ok(());
    }
    emit(state, session_id, ServerMessage::AuthenticationSuccess);
    info!(session = %session_id, user_id = %user_id, "session authenticated");

    let store = state.require_store().await?;
    let player = match store.find_player(user_id).await? {
        Some(player) => Some(player),
        None => {
            let is_player = state
                .sessions()
                .handshake_of(session_id)
                .is_some_and(|identity| identity.has(Capabilities::PLAYER));
            if is_player {
                let player = PlayerDataEntity::new(user_id, now);
                store.save_player(player.clone()).await?;
                debug!(user_id = %user_id, "player profile created");
                Some(player)
            } else {
                None
            }
        }
    };
    if let Some(team_id) = player.and_then(|player| player.team_id) {
        state.sessions().join_room(session_id, team_id);
    }
    Ok(())
}

/// Emit the caller's current role and, when playing, the open quest.
pub async fn status(
    state: &SharedState,
    session_id: SessionId,
    now: SystemTime,
) -> Result<(), ServiceError> {
    let Some(user_id) = state.sessions().user_of(session_id) else {
        emit(state, session_id, ServerMessage::StatusOff(StatusPayload::idle()));
        return Ok(());
    };
    let store = state.require_store().await?;

    let judges = active_judges(&store, store.list_fix_judges_for_user(user_id).await?, now).await?;
    if let Some(judge) = judges.into_iter().next() {
        emit(
            state,
            session_id,
            ServerMessage::StatusOn(StatusPayload::judging(JudgeAssignmentView {
                id: judge.id,
                users_id: judge.user_id,
                commands_id: judge.team_id,
                game_def_id: judge.game_def_id,
            })),
        );
        emit(state, session_id, ServerMessage::ClearGamesMarks);
        return Ok(());
    }

    let Some((player, team_id)) = store
        .find_player(user_id)
        .await?
        .and_then(|player| player.team_id.map(|team| (player, team)))
    else {
        emit(state, session_id, ServerMessage::StatusOn(StatusPayload::idle()));
        emit(state, session_id, ServerMessage::ClearGamesMarks);
        state.sessions().leave_room(session_id);
        return Ok(());
    };

    let Some(current) = store.find_current_game_for_team(team_id).await? else {
        emit(state, session_id, ServerMessage::StatusOn(StatusPayload::idle()));
        emit(state, session_id, ServerMessage::ClearGamesMarks);
        state.sessions().leave_room(session_id);
        return Ok(());
    };

    let progress = TeamProgress::load(&store, team_id, current.game_def_id).await?;
    // All quests played and waiting for the judge, or the next quest is not queued yet.
    let Some(open) = progress.open_attempt().cloned() else {
        emit(state, session_id, ServerMessage::StatusOn(StatusPayload::idle()));
        return Ok(());
    };

    state.sessions().join_room(session_id, team_id);

    let quest = store.find_quest(open.quest_id).await?.ok_or_else(|| {
        ServiceError::Invariant(format!("attempt `{}` references a missing quest", open.id))
    })?;
    let shooter = store
        .find_video_shooter(open.id)
        .await?
        .is_some_and(|shooter| shooter.player_data_id == player.id);

    emit(
        state,
        session_id,
        ServerMessage::StatusOn(StatusPayload::playing(
            shooter,
            QuestView {
                task: quest.task.clone(),
                hint: quest.hint.clone(),
                number: progress.finished.len() as u32 + 1,
                current_quest: open.id,
                current_game_id: current.id,
                visible: open.visible,
            },
        )),
    );

    if open.visible {
        let mark = store.find_mark(quest.mark_id).await?.ok_or_else(|| {
            ServiceError::Invariant(format!("quest `{}` references a missing mark", quest.id))
        })?;
        emit(
            state,
            session_id,
            ServerMessage::SetViewCurrentQuest(QuestMarkView {
                lat: mark.lat,
                lng: mark.lng,
                radius: quest.radius_m,
            }),
        );
        emit(state, session_id, ServerMessage::LoadMediaInstructions);
    } else {
        emit(state, session_id, ServerMessage::ClearGamesMarks);
        emit(state, session_id, ServerMessage::NotLoadMediaInstructions);
    }
    Ok(())
}

/// Emit 0 without a team, 1 for a member, 2 for the creator.
pub async fn command_status(state: &SharedState, session_id: SessionId) -> Result<(), ServiceError> {
    let user_id = session_user(state, session_id)?;
    let store = state.require_store().await?;

    let team_id = store
        .find_player(user_id)
        .await?
        .and_then(|player| player.team_id);
    let status = match team_id {
        None => 0,
        Some(team_id) => {
            let is_creator = store
                .find_team(team_id)
                .await?
                .is_some_and(|team| team.creator_user_id == Some(user_id));
            if is_creator { 2 } else { 1 }
        }
    };
    emit(
        state,
        session_id,
        ServerMessage::CommandStatusOn(CommandStatusPayload {
            status,
            commands_id: team_id,
        }),
    );
    Ok(())
}

async fn player_team(state: &SharedState, user_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store
        .find_player(user_id)
        .await?
        .and_then(|player| player.team_id))
}

/// Relay the caller's position to the rest of the team room.
pub async fn set_player_coordinates(
    state: &SharedState,
    session_id: SessionId,
    payload: CoordinatesPayload,
) -> Result<(), ServiceError> {
    let user_id = session_user(state, session_id)?;
    if payload.users_id != user_id {
        return Err(ServiceError::InvalidInput(
            "coordinates must describe the session user".into(),
        ));
    }
    if let Some(team_id) = player_team(state, user_id).await? {
        emit_to_room(
            state,
            team_id,
            Some(session_id),
            &ServerMessage::AddPlayerCoordinates(payload),
        );
    }
    Ok(())
}

/// Ask the rest of the team room to publish their positions.
pub async fn coordinates_players(
    state: &SharedState,
    session_id: SessionId,
) -> Result<(), ServiceError> {
    let user_id = session_user(state, session_id)?;
    if let Some(team_id) = player_team(state, user_id).await? {
        emit_to_room(
            state,
            team_id,
            Some(session_id),
            &ServerMessage::GetPlayerCoordinates,
        );
    }
    Ok(())
}

/// Persist the caller's position. Last writer wins.
pub async fn set_current_coordinates(
    state: &SharedState,
    session_id: SessionId,
    payload: CoordinatesPayload,
    now: SystemTime,
) -> Result<(), ServiceError> {
    let user_id = session_user(state, session_id)?;
    if payload.users_id != user_id {
        return Err(ServiceError::Unauthorized(
            "cannot write another user's coordinates".into(),
        ));
    }
    let store = state.require_store().await?;
    store
        .save_coord(PlayerCoordEntity {
            user_id,
            lat: payload.lat,
            lng: payload.lng,
            updated_at: now,
        })
        .await?;
    Ok(())
}

/// Echo the caller's stored position.
pub async fn get_my_coordinates(
    state: &SharedState,
    session_id: SessionId,
) -> Result<(), ServiceError> {
    let user_id = session_user(state, session_id)?;
    let store = state.require_store().await?;
    if let Some(coord) = store.find_coord(user_id).await? {
        emit(
            state,
            session_id,
            ServerMessage::SetMyCoordinates(PositionView {
                lat: coord.lat,
                lng: coord.lng,
            }),
        );
    }
    Ok(())
}

/// Forget the session and tell the user's team.
pub async fn disconnect(state: &SharedState, session_id: SessionId) {
    let Some(departed) = state.sessions().remove(session_id) else {
        return;
    };
    let Some(user_id) = departed.user_id else {
        return;
    };

    let team_id = match player_team(state, user_id).await {
        Ok(team) => team.or(departed.team_room),
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "could not resolve team on disconnect");
            departed.team_room
        }
    };
    if let Some(team_id) = team_id {
        emit_to_room(
            state,
            team_id,
            None,
            &ServerMessage::TeamPlayerDisconnect(DisconnectPayload { users_id: user_id }),
        );
    }
    info!(session = %session_id, user_id = %user_id, "session disconnected");
}
