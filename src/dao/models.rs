//! Plain records persisted by the quest store. References between records are identifiers.

use std::time::SystemTime;

use uuid::Uuid;

/// Per-user player profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDataEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Owning user; unique.
    pub user_id: Uuid,
    /// Team the player belongs to, if any.
    pub team_id: Option<Uuid>,
    /// Non-negative rating.
    pub rating: u32,
    /// When the player last joined a team (or the row creation time).
    pub joined_at: SystemTime,
}

impl PlayerDataEntity {
    /// Fresh team-less profile for `user_id`.
    pub fn new(user_id: Uuid, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            team_id: None,
            rating: 0,
            joined_at: now,
        }
    }
}

/// A team (called a command by clients).
#[derive(Debug, Clone, PartialEq)]
pub struct TeamEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Unique team name.
    pub name: String,
    /// Current creator; `None` once the last member left.
    pub creator_user_id: Option<Uuid>,
    /// Team rating.
    pub rating: i32,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Moderated game template with a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDefinitionEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Maximum number of registered teams.
    pub max_teams: u32,
    /// Start of the play window.
    pub date_begin: SystemTime,
    /// End of the play window.
    pub date_end: SystemTime,
    /// Minimum score to pass.
    pub min_score: i32,
    /// Free-form game type.
    pub kind: String,
    /// Definition rating.
    pub rating: i32,
    /// Human readable location.
    pub location: String,
    /// Author of the definition.
    pub creator_user_id: Uuid,
}

impl GameDefinitionEntity {
    /// Whether `now` falls inside `[date_begin, date_end)`.
    pub fn is_live(&self, now: SystemTime) -> bool {
        self.date_begin <= now && now < self.date_end
    }

    /// Whether the play window has closed at `now`.
    pub fn is_over(&self, now: SystemTime) -> bool {
        self.date_end <= now
    }
}

/// A single quest anchored at a mark.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Task shown to players.
    pub task: String,
    /// Hint shown to players.
    pub hint: String,
    /// Media instruction reference.
    pub media_ref: String,
    /// Visibility radius in metres.
    pub radius_m: f64,
    /// Anchor mark.
    pub mark_id: Uuid,
}

/// Geographic anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Human readable location.
    pub location: String,
}

/// One slot in a definition's ordered quest list.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestOrderEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Owning definition.
    pub game_def_id: Uuid,
    /// Quest at this slot.
    pub quest_id: Uuid,
    /// Insertion position; lists are sorted by it.
    pub position: u32,
}

/// Moderation verdict for a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedGameEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Moderated definition.
    pub game_def_id: Uuid,
    /// Moderator who decided.
    pub moderator_user_id: Uuid,
    /// Whether the definition is open for registration.
    pub accepted: bool,
}

/// A team's registration for a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Registered team.
    pub team_id: Uuid,
    /// Target definition.
    pub game_def_id: Uuid,
    /// Registration time; candidate order follows it.
    pub created_at: SystemTime,
}

/// The `(team, definition)` pair a team is currently playing.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentGameEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Playing team; unique.
    pub team_id: Uuid,
    /// Definition being played.
    pub game_def_id: Uuid,
    /// Activation time.
    pub created_at: SystemTime,
}

/// A team's attempt at one quest (a "game" on the wire).
#[derive(Debug, Clone, PartialEq)]
pub struct QuestAttemptEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Playing team.
    pub team_id: Uuid,
    /// Registration the attempt belongs to.
    pub registration_id: Uuid,
    /// Attempted quest; unique per registration.
    pub quest_id: Uuid,
    /// Whether the quest mark has been revealed.
    pub visible: bool,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Media submitted for an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFinishedEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Finished attempt; unique.
    pub game_id: Uuid,
    /// Reference to the uploaded media.
    pub media_ref: String,
    /// Submission time.
    pub finished_at: SystemTime,
}

/// A judge's score for a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeScoreEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Scored submission; unique.
    pub game_finished_id: Uuid,
    /// Judge assignment that produced the score.
    pub fix_judge_id: Uuid,
    /// Awarded points.
    pub score: i32,
}

/// Judge assignment for a `(team, definition)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FixJudgeEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Assigned judge.
    pub user_id: Uuid,
    /// Judged team.
    pub team_id: Uuid,
    /// Judged definition.
    pub game_def_id: Uuid,
    /// Assignment time.
    pub created_at: SystemTime,
}

/// Player elected to upload the media answer for an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoShooterEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Attempt; unique.
    pub game_id: Uuid,
    /// Elected player profile.
    pub player_data_id: Uuid,
}

/// Last known position of a user.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCoordEntity {
    /// Owning user; unique.
    pub user_id: Uuid,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Time of the last write.
    pub updated_at: SystemTime,
}

/// Terminal record of a team's run through a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteGameEntity {
    /// Row identifier.
    pub id: Uuid,
    /// Team; unique together with `game_def_id`.
    pub team_id: Uuid,
    /// Definition.
    pub game_def_id: Uuid,
    /// Whether every quest was scored before the deadline.
    pub completed: bool,
    /// Sum of judge scores.
    pub score: i32,
}
