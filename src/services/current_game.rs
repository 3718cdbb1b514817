//! Promotes a team's next live registration to its current game.

use std::{collections::HashSet, time::SystemTime};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{dao::models::CurrentGameEntity, error::ServiceError, state::SharedState};

/// One pass of the current-game loop. Returns the rows created.
pub async fn run_tick(
    state: &SharedState,
    now: SystemTime,
) -> Result<Vec<CurrentGameEntity>, ServiceError> {
    let store = state.require_store().await?;

    let busy: HashSet<Uuid> = store
        .list_current_games()
        .await?
        .into_iter()
        .map(|current| current.team_id)
        .collect();

    let mut created = Vec::new();
    for team in store.list_teams().await? {
        if busy.contains(&team.id) {
            continue;
        }

        for registration in store.list_registrations_for_team(team.id).await? {
            let live = store
                .find_game_definition(registration.game_def_id)
                .await?
                .is_some_and(|def| def.is_live(now));
            if !live {
                continue;
            }
            if store
                .find_complete_game(team.id, registration.game_def_id)
                .await?
                .is_some()
            {
                continue;
            }

            let current = CurrentGameEntity {
                id: Uuid::new_v4(),
                team_id: team.id,
                game_def_id: registration.game_def_id,
                created_at: now,
            };
            match store.create_current_game(current.clone()).await {
                Ok(()) => {
                    info!(
                        team_id = %team.id,
                        game_def_id = %current.game_def_id,
                        "game activated"
                    );
                    created.push(current);
                }
                Err(err) if err.is_conflict() => {
                    debug!(team_id = %team.id, "team already has a current game");
                }
                Err(err) => return Err(err.into()),
            }
            // A team plays one game at a time.
            break;
        }
    }

    Ok(created)
}
