//! Team creation, membership and game registration.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    capability::Capabilities,
    dao::models::{PlayerDataEntity, RegistrationEntity, TeamEntity},
    dto::team::{
        AddMemberRequest, CompletedGameView, CreateTeamRequest, LeaveTeamResponse,
        RegisterTeamRequest, RegistrationView, TeamView,
    },
    error::ServiceError,
    identity::Identity,
    state::SharedState,
};

/// Largest team size.
pub const MAX_TEAM_MEMBERS: usize = 6;
/// Smallest team allowed to register for a game.
pub const MIN_REGISTRATION_MEMBERS: usize = 3;

fn require_player(identity: &Identity) -> Result<(), ServiceError> {
    if identity.has(Capabilities::PLAYER) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized("player capability required".into()))
    }
}

/// Found a team with the caller as creator and first member.
pub async fn create_team(
    state: &SharedState,
    identity: &Identity,
    request: CreateTeamRequest,
    now: SystemTime,
) -> Result<TeamView, ServiceError> {
    require_player(identity)?;
    request.validate()?;
    let store = state.require_store().await?;
    let name = request.name.trim().to_owned();

    let mut player = store
        .find_player(identity.user_id)
        .await?
        .unwrap_or_else(|| PlayerDataEntity::new(identity.user_id, now));
    if player.team_id.is_some() {
        return Err(ServiceError::InvalidState("already a member of a team".into()));
    }
    if store.find_team_by_name(name.clone()).await?.is_some() {
        return Err(ServiceError::InvalidState(format!("team name `{name}` is taken")));
    }

    let team = TeamEntity {
        id: Uuid::new_v4(),
        name,
        creator_user_id: Some(identity.user_id),
        rating: 0,
        created_at: now,
    };
    store.create_team(team.clone()).await?;

    player.team_id = Some(team.id);
    player.joined_at = now;
    store.save_player(player.clone()).await?;

    info!(team_id = %team.id, user_id = %identity.user_id, "team created");
    Ok(TeamView::new(team, vec![player]))
}

/// Add a team-less player to the caller's team.
pub async fn add_member(
    state: &SharedState,
    identity: &Identity,
    team_id: Uuid,
    request: AddMemberRequest,
    now: SystemTime,
) -> Result<TeamView, ServiceError> {
    let store = state.require_store().await?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;

    match team.creator_user_id {
        None => {
            return Err(ServiceError::InvalidState(
                "team has no creator; joins are blocked".into(),
            ));
        }
        Some(creator) if creator != identity.user_id => {
            return Err(ServiceError::Unauthorized(
                "only the team creator may add members".into(),
            ));
        }
        Some(_) => {}
    }
    if store.find_current_game_for_team(team_id).await?.is_some() {
        return Err(ServiceError::InvalidState(
            "team is playing a game; membership is frozen".into(),
        ));
    }

    let mut members = store.list_team_members(team_id).await?;
    if members.len() >= MAX_TEAM_MEMBERS {
        return Err(ServiceError::InvalidState(format!(
            "team already has {MAX_TEAM_MEMBERS} members"
        )));
    }

    let mut player = store.find_player(request.user_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("player `{}` not found", request.user_id))
    })?;
    if player.team_id.is_some() {
        return Err(ServiceError::InvalidState(format!(
            "player `{}` is already on a team",
            request.user_id
        )));
    }
    player.team_id = Some(team_id);
    player.joined_at = now;
    store.save_player(player.clone()).await?;
    members.push(player);

    info!(team_id = %team_id, user_id = %request.user_id, "member added");
    Ok(TeamView::new(team, members))
}

/// Leave the caller's team. A departing creator hands over to the oldest remaining member.
pub async fn leave_team(
    state: &SharedState,
    identity: &Identity,
) -> Result<LeaveTeamResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut player = store
        .find_player(identity.user_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidState("not a member of a team".into()))?;
    let team_id = player
        .team_id
        .take()
        .ok_or_else(|| ServiceError::InvalidState("not a member of a team".into()))?;
    store.save_player(player).await?;
    let moved = state.sessions().set_user_room(identity.user_id, None);

    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::Invariant(format!("player references missing team `{team_id}`")))?;

    let mut creator = team.creator_user_id;
    if creator == Some(identity.user_id) {
        creator = store
            .list_team_members(team_id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .find(|user_id| *user_id != identity.user_id);
        store.set_team_creator(team_id, creator).await?;
        match creator {
            Some(next) => info!(team_id = %team_id, creator = %next, "team leadership transferred"),
            None => info!(team_id = %team_id, "last member left; team has no creator"),
        }
    }

    info!(team_id = %team_id, user_id = %identity.user_id, sessions = moved, "member left");
    Ok(LeaveTeamResponse {
        team_id,
        creator_user_id: creator,
    })
}

/// Register the caller's team for a game definition.
pub async fn register_team(
    state: &SharedState,
    identity: &Identity,
    request: RegisterTeamRequest,
    now: SystemTime,
) -> Result<RegistrationView, ServiceError> {
    let store = state.require_store().await?;
    let game_def_id = request.game_def_id;

    let team_id = store
        .find_player(identity.user_id)
        .await?
        .and_then(|player| player.team_id)
        .ok_or_else(|| ServiceError::InvalidState("not a member of a team".into()))?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::Invariant(format!("player references missing team `{team_id}`")))?;
    if team.creator_user_id != Some(identity.user_id) {
        return Err(ServiceError::Unauthorized(
            "only the team creator may register the team".into(),
        ));
    }

    let members = store.list_team_members(team_id).await?.len();
    if !(MIN_REGISTRATION_MEMBERS..=MAX_TEAM_MEMBERS).contains(&members) {
        return Err(ServiceError::InvalidState(format!(
            "team needs {MIN_REGISTRATION_MEMBERS} to {MAX_TEAM_MEMBERS} members to register (has {members})"
        )));
    }

    let definition = store
        .find_game_definition(game_def_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_def_id}` not found")))?;
    let accepted = store
        .find_checked_game(game_def_id)
        .await?
        .is_some_and(|checked| checked.accepted);
    if !accepted {
        return Err(ServiceError::InvalidState(format!(
            "game `{game_def_id}` is not accepted by a moderator"
        )));
    }
    if definition.date_begin < now || definition.date_end <= now {
        return Err(ServiceError::InvalidState(format!(
            "registration for game `{game_def_id}` is closed"
        )));
    }
    if store
        .find_registration(team_id, game_def_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::InvalidState("team is already registered".into()));
    }
    let registered = store.count_registrations_for_definition(game_def_id).await?;
    if registered >= u64::from(definition.max_teams) {
        return Err(ServiceError::InvalidState(format!(
            "game `{game_def_id}` is full ({registered} teams registered)"
        )));
    }
    if store
        .find_complete_game(team_id, game_def_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::InvalidState("team already played this game".into()));
    }
    if store
        .find_current_game_for_team(team_id)
        .await?
        .is_some_and(|current| current.game_def_id == game_def_id)
    {
        return Err(ServiceError::InvalidState("team is playing this game".into()));
    }

    let registration = RegistrationEntity {
        id: Uuid::new_v4(),
        team_id,
        game_def_id,
        created_at: now,
    };
    store.create_registration(registration.clone()).await?;

    info!(team_id = %team_id, game_def_id = %game_def_id, "team registered");
    Ok(registration.into())
}

/// Games the caller's team has finished, with their scores.
pub async fn team_games(
    state: &SharedState,
    identity: &Identity,
) -> Result<Vec<CompletedGameView>, ServiceError> {
    let store = state.require_store().await?;
    let team_id = store
        .find_player(identity.user_id)
        .await?
        .and_then(|player| player.team_id)
        .ok_or_else(|| ServiceError::NotFound("not a member of a team".into()))?;

    let mut games = Vec::new();
    for complete in store.list_complete_games_for_team(team_id).await? {
        // A deleted definition takes its completion rows with it.
        let Some(definition) = store.find_game_definition(complete.game_def_id).await? else {
            continue;
        };
        let quest_count = store.list_quest_order(definition.id).await?.len();
        games.push(CompletedGameView::new(complete, definition, quest_count));
    }
    Ok(games)
}

/// The caller's team with its members.
pub async fn my_team(state: &SharedState, identity: &Identity) -> Result<TeamView, ServiceError> {
    let store = state.require_store().await?;
    let team_id = store
        .find_player(identity.user_id)
        .await?
        .and_then(|player| player.team_id)
        .ok_or_else(|| ServiceError::NotFound("not a member of a team".into()))?;
    let team = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;
    let members = store.list_team_members(team_id).await?;
    Ok(TeamView::new(team, members))
}
