//! Process-local quest store backed by plain tables behind a single lock.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::QuestStore;
use crate::dao::{
    models::{
        CheckedGameEntity, CompleteGameEntity, CurrentGameEntity, FixJudgeEntity,
        GameDefinitionEntity, GameFinishedEntity, JudgeScoreEntity, MarkEntity,
        PlayerCoordEntity, PlayerDataEntity, QuestAttemptEntity, QuestEntity, QuestOrderEntity,
        RegistrationEntity, TeamEntity, VideoShooterEntity,
    },
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Tables {
    players: Vec<PlayerDataEntity>,
    teams: Vec<TeamEntity>,
    definitions: Vec<GameDefinitionEntity>,
    quests: Vec<QuestEntity>,
    marks: Vec<MarkEntity>,
    quest_orders: Vec<QuestOrderEntity>,
    checked_games: Vec<CheckedGameEntity>,
    registrations: Vec<RegistrationEntity>,
    current_games: Vec<CurrentGameEntity>,
    attempts: Vec<QuestAttemptEntity>,
    finished: Vec<GameFinishedEntity>,
    scores: Vec<JudgeScoreEntity>,
    fix_judges: Vec<FixJudgeEntity>,
    video_shooters: Vec<VideoShooterEntity>,
    coords: Vec<PlayerCoordEntity>,
    complete_games: Vec<CompleteGameEntity>,
}

impl Tables {
    /// Remove a definition and every row hanging off it.
    fn cascade_definition(&mut self, id: Uuid) -> bool {
        let before = self.definitions.len();
        self.definitions.retain(|def| def.id != id);
        if self.definitions.len() == before {
            return false;
        }

        self.quest_orders.retain(|entry| entry.game_def_id != id);
        self.checked_games.retain(|checked| checked.game_def_id != id);
        self.current_games.retain(|current| current.game_def_id != id);
        self.complete_games.retain(|complete| complete.game_def_id != id);

        let registration_ids: Vec<Uuid> = self
            .registrations
            .iter()
            .filter(|reg| reg.game_def_id == id)
            .map(|reg| reg.id)
            .collect();
        self.registrations.retain(|reg| reg.game_def_id != id);

        let attempt_ids: Vec<Uuid> = self
            .attempts
            .iter()
            .filter(|attempt| registration_ids.contains(&attempt.registration_id))
            .map(|attempt| attempt.id)
            .collect();
        self.attempts
            .retain(|attempt| !attempt_ids.contains(&attempt.id));
        self.video_shooters
            .retain(|shooter| !attempt_ids.contains(&shooter.game_id));

        let finished_ids: Vec<Uuid> = self
            .finished
            .iter()
            .filter(|finished| attempt_ids.contains(&finished.game_id))
            .map(|finished| finished.id)
            .collect();
        self.finished
            .retain(|finished| !finished_ids.contains(&finished.id));

        let judge_ids: Vec<Uuid> = self
            .fix_judges
            .iter()
            .filter(|judge| judge.game_def_id == id)
            .map(|judge| judge.id)
            .collect();
        self.fix_judges.retain(|judge| judge.game_def_id != id);

        self.scores.retain(|score| {
            !finished_ids.contains(&score.game_finished_id)
                && !judge_ids.contains(&score.fix_judge_id)
        });

        true
    }
}

/// In-memory [`QuestStore`] enforcing the same uniqueness rules as the database backends.
#[derive(Clone, Default)]
pub struct MemoryQuestStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryQuestStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T, F>(&self, query: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Tables) -> T + Send + 'static,
    {
        let tables = self.tables.clone();
        Box::pin(async move {
            let guard = tables.read().await;
            Ok(query(&guard))
        })
    }

    fn write<T, F>(&self, update: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> StorageResult<T> + Send + 'static,
    {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            update(&mut guard)
        })
    }
}

fn find_cloned<T: Clone>(rows: &[T], predicate: impl Fn(&T) -> bool) -> Option<T> {
    rows.iter().find(|row| predicate(row)).cloned()
}

fn filter_cloned<T: Clone>(rows: &[T], predicate: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().filter(|row| predicate(row)).cloned().collect()
}

impl QuestStore for MemoryQuestStore {
    fn find_player(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerDataEntity>>> {
        self.read(move |t| find_cloned(&t.players, |p| p.user_id == user_id))
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>> {
        self.read(|t| t.players.clone())
    }

    fn list_team_members(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>> {
        self.read(move |t| {
            let mut members = filter_cloned(&t.players, |p| p.team_id == Some(team_id));
            members.sort_by_key(|p| p.joined_at);
            members
        })
    }

    fn save_player(&self, player: PlayerDataEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            match t.players.iter_mut().find(|p| p.user_id == player.user_id) {
                Some(existing) => *existing = player,
                None => t.players.push(player),
            }
            Ok(())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        self.read(move |t| find_cloned(&t.teams, |team| team.id == id))
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        self.read(|t| t.teams.clone())
    }

    fn find_team_by_name(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        self.read(move |t| find_cloned(&t.teams, |team| team.name == name))
    }

    fn create_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.teams.iter().any(|existing| existing.name == team.name) {
                return Err(StorageError::conflict("team", &team.name));
            }
            t.teams.push(team);
            Ok(())
        })
    }

    fn set_team_creator(
        &self,
        team_id: Uuid,
        creator: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if let Some(team) = t.teams.iter_mut().find(|team| team.id == team_id) {
                team.creator_user_id = creator;
            }
            Ok(())
        })
    }

    fn find_game_definition(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameDefinitionEntity>>> {
        self.read(move |t| find_cloned(&t.definitions, |def| def.id == id))
    }

    fn list_game_definitions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<GameDefinitionEntity>>> {
        self.read(|t| {
            let mut definitions = t.definitions.clone();
            definitions.sort_by_key(|def| def.date_begin);
            definitions
        })
    }

    fn create_game_definition(
        &self,
        definition: GameDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.definitions.iter().any(|def| def.id == definition.id) {
                return Err(StorageError::conflict("game definition", definition.id));
            }
            t.definitions.push(definition);
            Ok(())
        })
    }

    fn delete_game_definition(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.write(move |t| Ok(t.cascade_definition(id)))
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        self.read(move |t| find_cloned(&t.quests, |quest| quest.id == id))
    }

    fn create_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            t.quests.push(quest);
            Ok(())
        })
    }

    fn find_mark(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MarkEntity>>> {
        self.read(move |t| find_cloned(&t.marks, |mark| mark.id == id))
    }

    fn create_mark(&self, mark: MarkEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            t.marks.push(mark);
            Ok(())
        })
    }

    fn list_quest_order(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestOrderEntity>>> {
        self.read(move |t| {
            let mut order = filter_cloned(&t.quest_orders, |entry| entry.game_def_id == game_def_id);
            order.sort_by_key(|entry| entry.position);
            order
        })
    }

    fn create_quest_order(&self, entry: QuestOrderEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            t.quest_orders.push(entry);
            Ok(())
        })
    }

    fn find_checked_game(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CheckedGameEntity>>> {
        self.read(move |t| find_cloned(&t.checked_games, |c| c.game_def_id == game_def_id))
    }

    fn create_checked_game(
        &self,
        checked: CheckedGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t
                .checked_games
                .iter()
                .any(|c| c.game_def_id == checked.game_def_id)
            {
                return Err(StorageError::conflict("checked game", checked.game_def_id));
            }
            t.checked_games.push(checked);
            Ok(())
        })
    }

    fn find_registration(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RegistrationEntity>>> {
        self.read(move |t| {
            find_cloned(&t.registrations, |reg| {
                reg.team_id == team_id && reg.game_def_id == game_def_id
            })
        })
    }

    fn list_registrations_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationEntity>>> {
        self.read(move |t| {
            let mut regs = filter_cloned(&t.registrations, |reg| reg.team_id == team_id);
            regs.sort_by_key(|reg| reg.created_at);
            regs
        })
    }

    fn count_registrations_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        self.read(move |t| {
            t.registrations
                .iter()
                .filter(|reg| reg.game_def_id == game_def_id)
                .count() as u64
        })
    }

    fn create_registration(
        &self,
        registration: RegistrationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.registrations.iter().any(|reg| {
                reg.team_id == registration.team_id && reg.game_def_id == registration.game_def_id
            }) {
                return Err(StorageError::conflict(
                    "registration",
                    format!("{}/{}", registration.team_id, registration.game_def_id),
                ));
            }
            t.registrations.push(registration);
            Ok(())
        })
    }

    fn list_current_games(&self) -> BoxFuture<'static, StorageResult<Vec<CurrentGameEntity>>> {
        self.read(|t| t.current_games.clone())
    }

    fn find_current_game_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CurrentGameEntity>>> {
        self.read(move |t| find_cloned(&t.current_games, |c| c.team_id == team_id))
    }

    fn create_current_game(
        &self,
        current: CurrentGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.current_games.iter().any(|c| c.team_id == current.team_id) {
                return Err(StorageError::conflict("current game", current.team_id));
            }
            t.current_games.push(current);
            Ok(())
        })
    }

    fn delete_current_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.write(move |t| {
            let before = t.current_games.len();
            t.current_games
                .retain(|c| !(c.team_id == team_id && c.game_def_id == game_def_id));
            Ok(t.current_games.len() != before)
        })
    }

    fn find_attempt(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestAttemptEntity>>> {
        self.read(move |t| find_cloned(&t.attempts, |a| a.id == id))
    }

    fn list_attempts(
        &self,
        team_id: Uuid,
        registration_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestAttemptEntity>>> {
        self.read(move |t| {
            let mut attempts = filter_cloned(&t.attempts, |a| {
                a.team_id == team_id && a.registration_id == registration_id
            });
            attempts.sort_by_key(|a| a.created_at);
            attempts
        })
    }

    fn create_attempt(&self, attempt: QuestAttemptEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.attempts.iter().any(|a| {
                a.registration_id == attempt.registration_id && a.quest_id == attempt.quest_id
            }) {
                return Err(StorageError::conflict("game", attempt.quest_id));
            }
            t.attempts.push(attempt);
            Ok(())
        })
    }

    fn reveal_attempt(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.write(move |t| {
            Ok(match t.attempts.iter_mut().find(|a| a.id == id) {
                Some(attempt) if !attempt.visible => {
                    attempt.visible = true;
                    true
                }
                _ => false,
            })
        })
    }

    fn find_finished(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameFinishedEntity>>> {
        self.read(move |t| find_cloned(&t.finished, |f| f.id == id))
    }

    fn list_finished(
        &self,
        game_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameFinishedEntity>>> {
        self.read(move |t| filter_cloned(&t.finished, |f| game_ids.contains(&f.game_id)))
    }

    fn create_finished(
        &self,
        finished: GameFinishedEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.finished.iter().any(|f| f.game_id == finished.game_id) {
                return Err(StorageError::conflict("game finished", finished.game_id));
            }
            t.finished.push(finished);
            Ok(())
        })
    }

    fn list_scores(
        &self,
        game_finished_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<JudgeScoreEntity>>> {
        self.read(move |t| {
            filter_cloned(&t.scores, |s| game_finished_ids.contains(&s.game_finished_id))
        })
    }

    fn create_score(&self, score: JudgeScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t
                .scores
                .iter()
                .any(|s| s.game_finished_id == score.game_finished_id)
            {
                return Err(StorageError::conflict("judge score", score.game_finished_id));
            }
            t.scores.push(score);
            Ok(())
        })
    }

    fn find_fix_judge(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<FixJudgeEntity>>> {
        self.read(move |t| find_cloned(&t.fix_judges, |j| j.id == id))
    }

    fn list_fix_judges(&self) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        self.read(|t| t.fix_judges.clone())
    }

    fn list_fix_judges_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        self.read(move |t| filter_cloned(&t.fix_judges, |j| j.user_id == user_id))
    }

    fn list_fix_judges_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        self.read(move |t| filter_cloned(&t.fix_judges, |j| j.game_def_id == game_def_id))
    }

    fn create_fix_judge(&self, judge: FixJudgeEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t
                .fix_judges
                .iter()
                .any(|j| j.team_id == judge.team_id && j.game_def_id == judge.game_def_id)
            {
                return Err(StorageError::conflict(
                    "fix judge",
                    format!("{}/{}", judge.team_id, judge.game_def_id),
                ));
            }
            t.fix_judges.push(judge);
            Ok(())
        })
    }

    fn delete_fix_judge(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.write(move |t| {
            let before = t.fix_judges.len();
            t.fix_judges.retain(|j| j.id != id);
            Ok(t.fix_judges.len() != before)
        })
    }

    fn find_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>> {
        self.read(move |t| find_cloned(&t.video_shooters, |v| v.game_id == game_id))
    }

    fn create_video_shooter(
        &self,
        shooter: VideoShooterEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            if t.video_shooters.iter().any(|v| v.game_id == shooter.game_id) {
                return Err(StorageError::conflict("video shooter", shooter.game_id));
            }
            t.video_shooters.push(shooter);
            Ok(())
        })
    }

    fn take_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>> {
        self.write(move |t| {
            let position = t.video_shooters.iter().position(|v| v.game_id == game_id);
            Ok(position.map(|index| t.video_shooters.remove(index)))
        })
    }

    fn find_coord(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerCoordEntity>>> {
        self.read(move |t| find_cloned(&t.coords, |c| c.user_id == user_id))
    }

    fn save_coord(&self, coord: PlayerCoordEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            match t.coords.iter_mut().find(|c| c.user_id == coord.user_id) {
                Some(existing) => *existing = coord,
                None => t.coords.push(coord),
            }
            Ok(())
        })
    }

    fn find_complete_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompleteGameEntity>>> {
        self.read(move |t| {
            find_cloned(&t.complete_games, |c| {
                c.team_id == team_id && c.game_def_id == game_def_id
            })
        })
    }

    fn list_complete_games_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CompleteGameEntity>>> {
        self.read(move |t| filter_cloned(&t.complete_games, |c| c.team_id == team_id))
    }

    fn save_complete_game(
        &self,
        complete: CompleteGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.write(move |t| {
            match t.complete_games.iter_mut().find(|c| {
                c.team_id == complete.team_id && c.game_def_id == complete.game_def_id
            }) {
                Some(existing) => {
                    existing.completed = complete.completed;
                    existing.score = complete.score;
                }
                None => t.complete_games.push(complete),
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
