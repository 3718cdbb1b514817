//! BSON documents stored in MongoDB. Identifiers are stored as hyphenated strings.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    CheckedGameEntity, CompleteGameEntity, CurrentGameEntity, FixJudgeEntity,
    GameDefinitionEntity, GameFinishedEntity, JudgeScoreEntity, MarkEntity, PlayerCoordEntity,
    PlayerDataEntity, QuestAttemptEntity, QuestEntity, QuestOrderEntity, RegistrationEntity,
    TeamEntity, VideoShooterEntity,
};

/// Mapping between a domain entity and its document in a dedicated collection.
pub trait MongoRecord: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    type Entity: Send + 'static;
    const COLLECTION: &'static str;

    fn from_entity(entity: Self::Entity) -> Self;
    fn into_entity(self) -> MongoResult<Self::Entity>;
}

fn parse_id(collection: &'static str, value: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(value).map_err(|source| MongoDaoError::InvalidId {
        collection,
        value: value.to_owned(),
        source,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    team_id: Option<String>,
    rating: i64,
    joined_at: DateTime,
}

impl MongoRecord for PlayerDocument {
    type Entity = PlayerDataEntity;
    const COLLECTION: &'static str = "players";

    fn from_entity(entity: PlayerDataEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            user_id: entity.user_id.to_string(),
            team_id: entity.team_id.map(|id| id.to_string()),
            rating: i64::from(entity.rating),
            joined_at: DateTime::from_system_time(entity.joined_at),
        }
    }

    fn into_entity(self) -> MongoResult<PlayerDataEntity> {
        Ok(PlayerDataEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            user_id: parse_id(Self::COLLECTION, &self.user_id)?,
            team_id: self
                .team_id
                .as_deref()
                .map(|id| parse_id(Self::COLLECTION, id))
                .transpose()?,
            rating: u32::try_from(self.rating).unwrap_or_default(),
            joined_at: self.joined_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    creator_user_id: Option<String>,
    rating: i32,
    created_at: DateTime,
}

impl MongoRecord for TeamDocument {
    type Entity = TeamEntity;
    const COLLECTION: &'static str = "teams";

    fn from_entity(entity: TeamEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            name: entity.name,
            creator_user_id: entity.creator_user_id.map(|id| id.to_string()),
            rating: entity.rating,
            created_at: DateTime::from_system_time(entity.created_at),
        }
    }

    fn into_entity(self) -> MongoResult<TeamEntity> {
        Ok(TeamEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            name: self.name,
            creator_user_id: self
                .creator_user_id
                .as_deref()
                .map(|id| parse_id(Self::COLLECTION, id))
                .transpose()?,
            rating: self.rating,
            created_at: self.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameDefinitionDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    max_teams: i64,
    date_begin: DateTime,
    date_end: DateTime,
    min_score: i32,
    kind: String,
    rating: i32,
    location: String,
    creator_user_id: String,
}

impl MongoRecord for GameDefinitionDocument {
    type Entity = GameDefinitionEntity;
    const COLLECTION: &'static str = "game_definitions";

    fn from_entity(entity: GameDefinitionEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            name: entity.name,
            max_teams: i64::from(entity.max_teams),
            date_begin: DateTime::from_system_time(entity.date_begin),
            date_end: DateTime::from_system_time(entity.date_end),
            min_score: entity.min_score,
            kind: entity.kind,
            rating: entity.rating,
            location: entity.location,
            creator_user_id: entity.creator_user_id.to_string(),
        }
    }

    fn into_entity(self) -> MongoResult<GameDefinitionEntity> {
        Ok(GameDefinitionEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            name: self.name,
            max_teams: u32::try_from(self.max_teams).unwrap_or_default(),
            date_begin: self.date_begin.to_system_time(),
            date_end: self.date_end.to_system_time(),
            min_score: self.min_score,
            kind: self.kind,
            rating: self.rating,
            location: self.location,
            creator_user_id: parse_id(Self::COLLECTION, &self.creator_user_id)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestDocument {
    #[serde(rename = "_id")]
    id: String,
    task: String,
    hint: String,
    media_ref: String,
    radius_m: f64,
    mark_id: String,
}

impl MongoRecord for QuestDocument {
    type Entity = QuestEntity;
    const COLLECTION: &'static str = "quests";

    fn from_entity(entity: QuestEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            task: entity.task,
            hint: entity.hint,
            media_ref: entity.media_ref,
            radius_m: entity.radius_m,
            mark_id: entity.mark_id.to_string(),
        }
    }

    fn into_entity(self) -> MongoResult<QuestEntity> {
        Ok(QuestEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            task: self.task,
            hint: self.hint,
            media_ref: self.media_ref,
            radius_m: self.radius_m,
            mark_id: parse_id(Self::COLLECTION, &self.mark_id)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkDocument {
    #[serde(rename = "_id")]
    id: String,
    lat: f64,
    lng: f64,
    location: String,
}

impl MongoRecord for MarkDocument {
    type Entity = MarkEntity;
    const COLLECTION: &'static str = "marks";

    fn from_entity(entity: MarkEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            lat: entity.lat,
            lng: entity.lng,
            location: entity.location,
        }
    }

    fn into_entity(self) -> MongoResult<MarkEntity> {
        Ok(MarkEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            lat: self.lat,
            lng: self.lng,
            location: self.location,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestOrderDocument {
    #[serde(rename = "_id")]
    id: String,
    game_def_id: String,
    quest_id: String,
    position: i64,
}

impl MongoRecord for QuestOrderDocument {
    type Entity = QuestOrderEntity;
    const COLLECTION: &'static str = "quest_orders";

    fn from_entity(entity: QuestOrderEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            quest_id: entity.quest_id.to_string(),
            position: i64::from(entity.position),
        }
    }

    fn into_entity(self) -> MongoResult<QuestOrderEntity> {
        Ok(QuestOrderEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            quest_id: parse_id(Self::COLLECTION, &self.quest_id)?,
            position: u32::try_from(self.position).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckedGameDocument {
    #[serde(rename = "_id")]
    id: String,
    game_def_id: String,
    moderator_user_id: String,
    accepted: bool,
}

impl MongoRecord for CheckedGameDocument {
    type Entity = CheckedGameEntity;
    const COLLECTION: &'static str = "checked_games";

    fn from_entity(entity: CheckedGameEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            moderator_user_id: entity.moderator_user_id.to_string(),
            accepted: entity.accepted,
        }
    }

    fn into_entity(self) -> MongoResult<CheckedGameEntity> {
        Ok(CheckedGameEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            moderator_user_id: parse_id(Self::COLLECTION, &self.moderator_user_id)?,
            accepted: self.accepted,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationDocument {
    #[serde(rename = "_id")]
    id: String,
    team_id: String,
    game_def_id: String,
    created_at: DateTime,
}

impl MongoRecord for RegistrationDocument {
    type Entity = RegistrationEntity;
    const COLLECTION: &'static str = "registrations";

    fn from_entity(entity: RegistrationEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            team_id: entity.team_id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            created_at: DateTime::from_system_time(entity.created_at),
        }
    }

    fn into_entity(self) -> MongoResult<RegistrationEntity> {
        Ok(RegistrationEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            team_id: parse_id(Self::COLLECTION, &self.team_id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            created_at: self.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentGameDocument {
    #[serde(rename = "_id")]
    id: String,
    team_id: String,
    game_def_id: String,
    created_at: DateTime,
}

impl MongoRecord for CurrentGameDocument {
    type Entity = CurrentGameEntity;
    const COLLECTION: &'static str = "current_games";

    fn from_entity(entity: CurrentGameEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            team_id: entity.team_id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            created_at: DateTime::from_system_time(entity.created_at),
        }
    }

    fn into_entity(self) -> MongoResult<CurrentGameEntity> {
        Ok(CurrentGameEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            team_id: parse_id(Self::COLLECTION, &self.team_id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            created_at: self.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptDocument {
    #[serde(rename = "_id")]
    id: String,
    team_id: String,
    registration_id: String,
    quest_id: String,
    visible: bool,
    created_at: DateTime,
}

impl MongoRecord for AttemptDocument {
    type Entity = QuestAttemptEntity;
    const COLLECTION: &'static str = "games";

    fn from_entity(entity: QuestAttemptEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            team_id: entity.team_id.to_string(),
            registration_id: entity.registration_id.to_string(),
            quest_id: entity.quest_id.to_string(),
            visible: entity.visible,
            created_at: DateTime::from_system_time(entity.created_at),
        }
    }

    fn into_entity(self) -> MongoResult<QuestAttemptEntity> {
        Ok(QuestAttemptEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            team_id: parse_id(Self::COLLECTION, &self.team_id)?,
            registration_id: parse_id(Self::COLLECTION, &self.registration_id)?,
            quest_id: parse_id(Self::COLLECTION, &self.quest_id)?,
            visible: self.visible,
            created_at: self.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinishedDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    media_ref: String,
    finished_at: DateTime,
}

impl MongoRecord for FinishedDocument {
    type Entity = GameFinishedEntity;
    const COLLECTION: &'static str = "games_finished";

    fn from_entity(entity: GameFinishedEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            game_id: entity.game_id.to_string(),
            media_ref: entity.media_ref,
            finished_at: DateTime::from_system_time(entity.finished_at),
        }
    }

    fn into_entity(self) -> MongoResult<GameFinishedEntity> {
        Ok(GameFinishedEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            game_id: parse_id(Self::COLLECTION, &self.game_id)?,
            media_ref: self.media_ref,
            finished_at: self.finished_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreDocument {
    #[serde(rename = "_id")]
    id: String,
    game_finished_id: String,
    fix_judge_id: String,
    score: i32,
}

impl MongoRecord for ScoreDocument {
    type Entity = JudgeScoreEntity;
    const COLLECTION: &'static str = "judge_scores";

    fn from_entity(entity: JudgeScoreEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            game_finished_id: entity.game_finished_id.to_string(),
            fix_judge_id: entity.fix_judge_id.to_string(),
            score: entity.score,
        }
    }

    fn into_entity(self) -> MongoResult<JudgeScoreEntity> {
        Ok(JudgeScoreEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            game_finished_id: parse_id(Self::COLLECTION, &self.game_finished_id)?,
            fix_judge_id: parse_id(Self::COLLECTION, &self.fix_judge_id)?,
            score: self.score,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FixJudgeDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    team_id: String,
    game_def_id: String,
    created_at: DateTime,
}

impl MongoRecord for FixJudgeDocument {
    type Entity = FixJudgeEntity;
    const COLLECTION: &'static str = "fix_judges";

    fn from_entity(entity: FixJudgeEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            user_id: entity.user_id.to_string(),
            team_id: entity.team_id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            created_at: DateTime::from_system_time(entity.created_at),
        }
    }

    fn into_entity(self) -> MongoResult<FixJudgeEntity> {
        Ok(FixJudgeEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            user_id: parse_id(Self::COLLECTION, &self.user_id)?,
            team_id: parse_id(Self::COLLECTION, &self.team_id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            created_at: self.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoShooterDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    player_data_id: String,
}

impl MongoRecord for VideoShooterDocument {
    type Entity = VideoShooterEntity;
    const COLLECTION: &'static str = "video_shooters";

    fn from_entity(entity: VideoShooterEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            game_id: entity.game_id.to_string(),
            player_data_id: entity.player_data_id.to_string(),
        }
    }

    fn into_entity(self) -> MongoResult<VideoShooterEntity> {
        Ok(VideoShooterEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            game_id: parse_id(Self::COLLECTION, &self.game_id)?,
            player_data_id: parse_id(Self::COLLECTION, &self.player_data_id)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoordDocument {
    #[serde(rename = "_id")]
    user_id: String,
    lat: f64,
    lng: f64,
    updated_at: DateTime,
}

impl MongoRecord for CoordDocument {
    type Entity = PlayerCoordEntity;
    const COLLECTION: &'static str = "player_coords";

    fn from_entity(entity: PlayerCoordEntity) -> Self {
        Self {
            user_id: entity.user_id.to_string(),
            lat: entity.lat,
            lng: entity.lng,
            updated_at: DateTime::from_system_time(entity.updated_at),
        }
    }

    fn into_entity(self) -> MongoResult<PlayerCoordEntity> {
        Ok(PlayerCoordEntity {
            user_id: parse_id(Self::COLLECTION, &self.user_id)?,
            lat: self.lat,
            lng: self.lng,
            updated_at: self.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteGameDocument {
    #[serde(rename = "_id")]
    id: String,
    team_id: String,
    game_def_id: String,
    completed: bool,
    score: i32,
}

impl MongoRecord for CompleteGameDocument {
    type Entity = CompleteGameEntity;
    const COLLECTION: &'static str = "complete_games";

    fn from_entity(entity: CompleteGameEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            team_id: entity.team_id.to_string(),
            game_def_id: entity.game_def_id.to_string(),
            completed: entity.completed,
            score: entity.score,
        }
    }

    fn into_entity(self) -> MongoResult<CompleteGameEntity> {
        Ok(CompleteGameEntity {
            id: parse_id(Self::COLLECTION, &self.id)?,
            team_id: parse_id(Self::COLLECTION, &self.team_id)?,
            game_def_id: parse_id(Self::COLLECTION, &self.game_def_id)?,
            completed: self.completed,
            score: self.score,
        })
    }
}
