//! Team management payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        CompleteGameEntity, GameDefinitionEntity, PlayerDataEntity, RegistrationEntity, TeamEntity,
    },
    dto::{format_system_time, validation::validate_team_name},
};

/// Request to found a new team with the caller as creator.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateTeamRequest {
    #[validate(custom(function = "validate_team_name"))]
    pub name: String,
}

/// Request from a creator to add a player to their team.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Request from a creator to register the team for a game.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterTeamRequest {
    pub game_def_id: Uuid,
}

/// Team with its members.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamView {
    pub id: Uuid,
    pub name: String,
    /// `null` while the team has no creator.
    pub creator_user_id: Option<Uuid>,
    pub rating: i32,
    pub created_at: String,
    pub members: Vec<TeamMemberView>,
}

impl TeamView {
    /// Assemble the view from a team and its members.
    pub fn new(team: TeamEntity, members: Vec<PlayerDataEntity>) -> Self {
        Self {
            id: team.id,
            name: team.name,
            creator_user_id: team.creator_user_id,
            rating: team.rating,
            created_at: format_system_time(team.created_at),
            members: members.into_iter().map(TeamMemberView::from).collect(),
        }
    }
}

/// One team member.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamMemberView {
    pub user_id: Uuid,
    pub rating: u32,
    pub joined_at: String,
}

impl From<PlayerDataEntity> for TeamMemberView {
    fn from(player: PlayerDataEntity) -> Self {
        Self {
            user_id: player.user_id,
            rating: player.rating,
            joined_at: format_system_time(player.joined_at),
        }
    }
}

/// Outcome of leaving a team.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveTeamResponse {
    pub team_id: Uuid,
    /// Creator after the departure; `null` when nobody is left.
    pub creator_user_id: Option<Uuid>,
}

/// A team's registration for a game definition.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationView {
    pub id: Uuid,
    pub team_id: Uuid,
    pub game_def_id: Uuid,
    pub created_at: String,
}

impl From<RegistrationEntity> for RegistrationView {
    fn from(registration: RegistrationEntity) -> Self {
        Self {
            id: registration.id,
            team_id: registration.team_id,
            game_def_id: registration.game_def_id,
            created_at: format_system_time(registration.created_at),
        }
    }
}

/// One finished game in a team's history.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompletedGameView {
    pub game_def_id: Uuid,
    pub name: String,
    pub location: String,
    pub date_begin: String,
    /// Whether every quest was scored before the deadline.
    pub completed: bool,
    pub score: i32,
    pub min_score: i32,
    pub quest_count: usize,
}

impl CompletedGameView {
    /// Assemble the view from a completion record and the definition it closed.
    pub fn new(
        complete: CompleteGameEntity,
        definition: GameDefinitionEntity,
        quest_count: usize,
    ) -> Self {
        Self {
            game_def_id: complete.game_def_id,
            name: definition.name,
            location: definition.location,
            date_begin: format_system_time(definition.date_begin),
            completed: complete.completed,
            score: complete.score,
            min_score: definition.min_score,
            quest_count,
        }
    }
}
