//! Elects a judge for every current game that has none.

use std::{
    collections::{HashMap, HashSet},
    time::SystemTime,
};

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    dao::models::{FixJudgeEntity, PlayerDataEntity},
    error::ServiceError,
    services::progress::active_judges,
    state::SharedState,
};

/// One pass of the judge-assignment loop. Returns the judges created.
pub async fn run_tick(
    state: &SharedState,
    now: SystemTime,
) -> Result<Vec<FixJudgeEntity>, ServiceError> {
    let store = state.require_store().await?;

    let current_games = store.list_current_games().await?;
    if current_games.is_empty() {
        return Ok(Vec::new());
    }

    let judges = active_judges(&store, store.list_fix_judges().await?, now).await?;

    // Two rows for one pair break the model; keep the oldest so the loop does not livelock.
    let mut assigned: HashMap<(Uuid, Uuid), Uuid> = HashMap::new();
    let mut busy_judges: HashSet<Uuid> = HashSet::new();
    for judge in &judges {
        let key = (judge.team_id, judge.game_def_id);
        if let Some(kept) = assigned.get(&key) {
            error!(
                team_id = %judge.team_id,
                game_def_id = %judge.game_def_id,
                kept = %kept,
                duplicate = %judge.id,
                "duplicate judge assignment; removing the newer row"
            );
            store.delete_fix_judge(judge.id).await?;
            continue;
        }
        assigned.insert(key, judge.id);
        busy_judges.insert(judge.user_id);
    }

    let playing_teams: HashSet<Uuid> = current_games.iter().map(|c| c.team_id).collect();
    let players = store.list_players().await?;
    let mut created = Vec::new();

    for current in &current_games {
        if assigned.contains_key(&(current.team_id, current.game_def_id)) {
            continue;
        }
        let finished = store
            .find_game_definition(current.game_def_id)
            .await?
            .is_none_or(|def| def.is_over(now))
            || store
                .find_complete_game(current.team_id, current.game_def_id)
                .await?
                .is_some();
        if finished {
            continue;
        }

        let pool = candidate_pool(&players, &playing_teams, current.team_id, &busy_judges);
        let Some(index) = state.random_index(pool.len()) else {
            debug!(
                team_id = %current.team_id,
                game_def_id = %current.game_def_id,
                "no eligible judge; game waits"
            );
            continue;
        };
        let chosen = pool[index].user_id;

        let judge = FixJudgeEntity {
            id: Uuid::new_v4(),
            user_id: chosen,
            team_id: current.team_id,
            game_def_id: current.game_def_id,
            created_at: now,
        };
        match store.create_fix_judge(judge.clone()).await {
            Ok(()) => {
                info!(
                    team_id = %judge.team_id,
                    game_def_id = %judge.game_def_id,
                    user_id = %judge.user_id,
                    "judge assigned"
                );
                busy_judges.insert(chosen);
                assigned.insert((judge.team_id, judge.game_def_id), judge.id);
                created.push(judge);
            }
            Err(err) if err.is_conflict() => {
                debug!(team_id = %current.team_id, "judge assigned concurrently");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(created)
}

/// Players allowed to judge `team_id`.
///
/// Players whose team is not playing (team-less ones included) come first; when none exist
/// every player outside `team_id` is considered. Players already judging are then removed.
fn candidate_pool<'a>(
    players: &'a [PlayerDataEntity],
    playing_teams: &HashSet<Uuid>,
    team_id: Uuid,
    busy_judges: &HashSet<Uuid>,
) -> Vec<&'a PlayerDataEntity> {
    let idle: Vec<&PlayerDataEntity> = players
        .iter()
        .filter(|p| p.team_id.is_none_or(|team| !playing_teams.contains(&team)))
        .collect();
    let pool = if idle.is_empty() {
        players
            .iter()
            .filter(|p| p.team_id != Some(team_id))
            .collect()
    } else {
        idle
    };
    pool.into_iter()
        .filter(|p| !busy_judges.contains(&p.user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(team_id: Option<Uuid>) -> PlayerDataEntity {
        PlayerDataEntity {
            team_id,
            ..PlayerDataEntity::new(Uuid::new_v4(), SystemTime::UNIX_EPOCH)
        }
    }

    #[test]
    fn idle_players_are_preferred() {
        let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());
        let players = vec![player(Some(t1)), player(Some(t2)), player(None)];
        let playing: HashSet<Uuid> = [t1, t2].into();

        let pool = candidate_pool(&players, &playing, t1, &HashSet::new());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].team_id, None);
    }

    #[test]
    fn fallback_excludes_the_judged_team() {
        let (t1, t2) = (Uuid::new_v4(), Uuid::new_v4());
        let players = vec![player(Some(t1)), player(Some(t2))];
        let playing: HashSet<Uuid> = [t1, t2].into();

        let pool = candidate_pool(&players, &playing, t1, &HashSet::new());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].team_id, Some(t2));
    }

    #[test]
    fn lone_playing_team_gets_no_judge() {
        let t1 = Uuid::new_v4();
        let players = vec![player(Some(t1)), player(Some(t1)), player(Some(t1))];
        let playing: HashSet<Uuid> = [t1].into();
        assert!(candidate_pool(&players, &playing, t1, &HashSet::new()).is_empty());
    }

    #[test]
    fn busy_judges_are_skipped() {
        let t1 = Uuid::new_v4();
        let idle = player(None);
        let players = vec![idle.clone(), player(Some(t1))];
        let playing: HashSet<Uuid> = [t1].into();
        let busy: HashSet<Uuid> = [idle.user_id].into();
        assert!(candidate_pool(&players, &playing, t1, &busy).is_empty());
    }
}
