//! Import and removal of moderator-accepted game definitions.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    capability::Capabilities,
    dao::models::{
        CheckedGameEntity, GameDefinitionEntity, MarkEntity, QuestEntity, QuestOrderEntity,
    },
    dto::{
        catalog::{CreateDefinitionRequest, DefinitionCreatedResponse, OpenDefinitionView},
        validation::parse_rfc3339,
    },
    error::ServiceError,
    identity::Identity,
    state::SharedState,
};

fn require_catalog(identity: &Identity) -> Result<(), ServiceError> {
    if identity.capabilities.has_any(Capabilities::CATALOG) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "catalogue management requires a staff capability".into(),
        ))
    }
}

fn timestamp(field: &str, value: &str) -> Result<SystemTime, ServiceError> {
    parse_rfc3339(value)
        .ok_or_else(|| ServiceError::InvalidInput(format!("`{field}` is not an RFC 3339 timestamp")))
}

/// Store a definition with its marks, quests, quest order and acceptance record.
pub async fn create_definition(
    state: &SharedState,
    identity: &Identity,
    request: CreateDefinitionRequest,
) -> Result<DefinitionCreatedResponse, ServiceError> {
    require_catalog(identity)?;
    request.validate()?;
    let store = state.require_store().await?;

    let definition = GameDefinitionEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
        max_teams: request.max_teams,
        date_begin: timestamp("date_begin", &request.date_begin)?,
        date_end: timestamp("date_end", &request.date_end)?,
        min_score: request.min_score,
        kind: request.kind,
        rating: request.rating,
        location: request.location,
        creator_user_id: identity.user_id,
    };
    store.create_game_definition(definition.clone()).await?;

    let mut quest_ids = Vec::with_capacity(request.quests.len());
    for (position, input) in request.quests.into_iter().enumerate() {
        let mark = MarkEntity {
            id: Uuid::new_v4(),
            lat: input.mark.lat,
            lng: input.mark.lng,
            location: input.mark.location,
        };
        store.create_mark(mark.clone()).await?;

        let quest = QuestEntity {
            id: Uuid::new_v4(),
            task: input.task,
            hint: input.hint,
            media_ref: input.media_ref,
            radius_m: input.radius_m,
            mark_id: mark.id,
        };
        store.create_quest(quest.clone()).await?;
        store
            .create_quest_order(QuestOrderEntity {
                id: Uuid::new_v4(),
                game_def_id: definition.id,
                quest_id: quest.id,
                position: position as u32,
            })
            .await?;
        quest_ids.push(quest.id);
    }

    store
        .create_checked_game(CheckedGameEntity {
            id: Uuid::new_v4(),
            game_def_id: definition.id,
            moderator_user_id: identity.user_id,
            accepted: true,
        })
        .await?;

    info!(game_def_id = %definition.id, quests = quest_ids.len(), "game definition imported");
    Ok(DefinitionCreatedResponse {
        id: definition.id,
        quest_ids,
    })
}

/// Delete a definition and everything that depends on it.
pub async fn delete_definition(
    state: &SharedState,
    identity: &Identity,
    id: Uuid,
) -> Result<(), ServiceError> {
    require_catalog(identity)?;
    let store = state.require_store().await?;
    if !store.delete_game_definition(id).await? {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    }
    info!(game_def_id = %id, "game definition deleted");
    Ok(())
}

/// Accepted definitions that have not started and still have room for another team.
pub async fn open_definitions(
    state: &SharedState,
    now: SystemTime,
) -> Result<Vec<OpenDefinitionView>, ServiceError> {
    let store = state.require_store().await?;
    let mut open = Vec::new();
    for definition in store.list_game_definitions().await? {
        if definition.date_begin < now {
            continue;
        }
        let accepted = store
            .find_checked_game(definition.id)
            .await?
            .is_some_and(|checked| checked.accepted);
        if !accepted {
            continue;
        }
        let registered = store.count_registrations_for_definition(definition.id).await?;
        if registered >= u64::from(definition.max_teams) {
            continue;
        }
        let quest_count = store.list_quest_order(definition.id).await?.len();
        open.push(OpenDefinitionView::new(definition, registered, quest_count));
    }
    Ok(open)
}
