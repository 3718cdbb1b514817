pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    CheckedGameEntity, CompleteGameEntity, CurrentGameEntity, FixJudgeEntity,
    GameDefinitionEntity, GameFinishedEntity, JudgeScoreEntity, MarkEntity, PlayerCoordEntity,
    PlayerDataEntity, QuestAttemptEntity, QuestEntity, QuestOrderEntity, RegistrationEntity,
    TeamEntity, VideoShooterEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use memory::MemoryQuestStore;

/// Typed predicate queries over every entity the quest engine reads or writes.
///
/// Every `create_*` enforces the uniqueness invariant of its entity and fails with
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict) when it is hit.
/// List operations return rows in insertion order unless stated otherwise.
pub trait QuestStore: Send + Sync {
    // players
    fn find_player(&self, user_id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<PlayerDataEntity>>>;
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>>;
    /// Members of `team_id`, oldest member first.
    fn list_team_members(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>>;
    /// Insert or replace the profile keyed by its `user_id`.
    fn save_player(&self, player: PlayerDataEntity) -> BoxFuture<'static, StorageResult<()>>;

    // teams
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Every team, oldest first.
    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    fn find_team_by_name(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    fn create_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn set_team_creator(
        &self,
        team_id: Uuid,
        creator: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>>;

    // catalogue
    fn find_game_definition(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameDefinitionEntity>>>;
    /// Every definition, earliest `date_begin` first.
    fn list_game_definitions(&self)
    -> BoxFuture<'static, StorageResult<Vec<GameDefinitionEntity>>>;
    fn create_game_definition(
        &self,
        definition: GameDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a definition and every row that depends on it. Returns whether it existed.
    fn delete_game_definition(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>>;
    fn create_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_mark(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MarkEntity>>>;
    fn create_mark(&self, mark: MarkEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Ordered quest list of a definition, sorted by position.
    fn list_quest_order(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestOrderEntity>>>;
    fn create_quest_order(&self, entry: QuestOrderEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_checked_game(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CheckedGameEntity>>>;
    fn create_checked_game(
        &self,
        checked: CheckedGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    // registrations
    fn find_registration(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RegistrationEntity>>>;
    /// Registrations of `team_id`, oldest first.
    fn list_registrations_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationEntity>>>;
    /// Number of teams registered for `game_def_id`.
    fn count_registrations_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    fn create_registration(
        &self,
        registration: RegistrationEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    // current games
    fn list_current_games(&self) -> BoxFuture<'static, StorageResult<Vec<CurrentGameEntity>>>;
    fn find_current_game_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CurrentGameEntity>>>;
    fn create_current_game(&self, current: CurrentGameEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Delete the current game for `(team, definition)`. Returns whether a row was removed.
    fn delete_current_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    // attempts
    fn find_attempt(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<QuestAttemptEntity>>>;
    /// Attempts of `(team, registration)`, oldest first.
    fn list_attempts(
        &self,
        team_id: Uuid,
        registration_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestAttemptEntity>>>;
    fn create_attempt(&self, attempt: QuestAttemptEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Flip `visible` from false to true. Returns whether this call performed the flip.
    fn reveal_attempt(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // finished attempts and scores
    fn find_finished(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameFinishedEntity>>>;
    fn list_finished(
        &self,
        game_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameFinishedEntity>>>;
    fn create_finished(&self, finished: GameFinishedEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn list_scores(
        &self,
        game_finished_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<JudgeScoreEntity>>>;
    fn create_score(&self, score: JudgeScoreEntity) -> BoxFuture<'static, StorageResult<()>>;

    // judges
    fn find_fix_judge(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<FixJudgeEntity>>>;
    fn list_fix_judges(&self) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>>;
    fn list_fix_judges_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>>;
    fn list_fix_judges_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>>;
    fn create_fix_judge(&self, judge: FixJudgeEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_fix_judge(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    // video shooters
    fn find_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>>;
    fn create_video_shooter(
        &self,
        shooter: VideoShooterEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically remove the shooter of `game_id`, returning it if one existed.
    fn take_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>>;

    // coordinates
    fn find_coord(&self, user_id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<PlayerCoordEntity>>>;
    /// Last writer wins.
    fn save_coord(&self, coord: PlayerCoordEntity) -> BoxFuture<'static, StorageResult<()>>;

    // completion
    fn find_complete_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompleteGameEntity>>>;
    /// Completion records of `team_id`.
    fn list_complete_games_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CompleteGameEntity>>>;
    /// Insert or replace the record keyed by `(team_id, game_def_id)`.
    fn save_complete_game(
        &self,
        complete: CompleteGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
