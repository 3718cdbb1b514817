//! Snapshot of one team's progress through a game definition.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use uuid::Uuid;

use crate::{
    dao::{
        models::{
            FixJudgeEntity, GameFinishedEntity, JudgeScoreEntity, QuestAttemptEntity,
            QuestOrderEntity, RegistrationEntity,
        },
        quest_store::QuestStore,
        storage::StorageResult,
    },
    error::ServiceError,
};

/// Everything the engine needs to decide a team's next step, read in one pass.
#[derive(Debug, Clone)]
pub struct TeamProgress {
    /// Registration the attempts hang off.
    pub registration: RegistrationEntity,
    /// Quest order of the definition.
    pub order: Vec<QuestOrderEntity>,
    /// Attempts created so far, oldest first.
    pub played: Vec<QuestAttemptEntity>,
    /// Finished rows of `played`.
    pub finished: Vec<GameFinishedEntity>,
    /// Scores given to `finished`.
    pub scores: Vec<JudgeScoreEntity>,
}

impl TeamProgress {
    /// Load the progress of `team_id` on `game_def_id`.
    ///
    /// A missing registration is an integrity failure: attempts cannot exist without one.
    pub async fn load(
        store: &Arc<dyn QuestStore>,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> Result<Self, ServiceError> {
        let registration = store
            .find_registration(team_id, game_def_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Invariant(format!(
                    "team `{team_id}` plays `{game_def_id}` without a registration"
                ))
            })?;
        let order = store.list_quest_order(game_def_id).await?;
        let played = store.list_attempts(team_id, registration.id).await?;
        let finished = store
            .list_finished(played.iter().map(|attempt| attempt.id).collect())
            .await?;
        let scores = store
            .list_scores(finished.iter().map(|row| row.id).collect())
            .await?;

        Ok(Self {
            registration,
            order,
            played,
            finished,
            scores,
        })
    }

    fn finished_games(&self) -> HashSet<Uuid> {
        self.finished.iter().map(|row| row.game_id).collect()
    }

    /// The attempt currently in play: the latest one without a finished row.
    pub fn open_attempt(&self) -> Option<&QuestAttemptEntity> {
        let finished = self.finished_games();
        self.played
            .iter()
            .rev()
            .find(|attempt| !finished.contains(&attempt.id))
    }

    /// First quest of the order that has no attempt yet.
    pub fn next_quest(&self) -> Option<Uuid> {
        let played: HashSet<Uuid> = self.played.iter().map(|attempt| attempt.quest_id).collect();
        self.order
            .iter()
            .map(|entry| entry.quest_id)
            .find(|quest_id| !played.contains(quest_id))
    }

    /// Number of finished attempts holding a score.
    pub fn scored_count(&self) -> usize {
        let scored: HashSet<Uuid> = self
            .scores
            .iter()
            .map(|score| score.game_finished_id)
            .collect();
        self.finished
            .iter()
            .filter(|row| scored.contains(&row.id))
            .count()
    }

    /// Sum of every score given so far.
    pub fn total_score(&self) -> i32 {
        self.scores.iter().map(|score| score.score).sum()
    }

    /// Every quest is finished and scored. An empty order counts as complete.
    pub fn all_scored(&self) -> bool {
        let total = self.order.len();
        self.finished.len() == total && self.scored_count() == total
    }

    /// Every quest has a finished attempt but some still wait for the judge.
    pub fn awaiting_scores(&self) -> bool {
        !self.order.is_empty() && self.finished.len() == self.order.len() && !self.all_scored()
    }
}

/// Drop judge rows whose game is over or already completed.
///
/// Definition and completion lookups are shared across rows of the same pair.
pub async fn active_judges(
    store: &Arc<dyn QuestStore>,
    judges: Vec<FixJudgeEntity>,
    now: SystemTime,
) -> StorageResult<Vec<FixJudgeEntity>> {
    let mut expired: HashMap<(Uuid, Uuid), bool> = HashMap::new();
    let mut active = Vec::with_capacity(judges.len());
    for judge in judges {
        let key = (judge.team_id, judge.game_def_id);
        let is_expired = match expired.get(&key) {
            Some(value) => *value,
            None => {
                let over = store
                    .find_game_definition(judge.game_def_id)
                    .await?
                    .is_none_or(|def| def.is_over(now));
                let value = over
                    || store
                        .find_complete_game(judge.team_id, judge.game_def_id)
                        .await?
                        .is_some();
                expired.insert(key, value);
                value
            }
        };
        if !is_expired {
            active.push(judge);
        }
    }
    Ok(active)
}
