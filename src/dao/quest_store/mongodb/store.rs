use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        AttemptDocument, CheckedGameDocument, CompleteGameDocument, CoordDocument,
        CurrentGameDocument, FinishedDocument, FixJudgeDocument, GameDefinitionDocument,
        MarkDocument, MongoRecord, PlayerDocument, QuestDocument, QuestOrderDocument,
        RegistrationDocument, ScoreDocument, TeamDocument, VideoShooterDocument,
    },
};
use crate::dao::{
    models::{
        CheckedGameEntity, CompleteGameEntity, CurrentGameEntity, FixJudgeEntity,
        GameDefinitionEntity, GameFinishedEntity, JudgeScoreEntity, MarkEntity,
        PlayerCoordEntity, PlayerDataEntity, QuestAttemptEntity, QuestEntity, QuestOrderEntity,
        RegistrationEntity, TeamEntity, VideoShooterEntity,
    },
    quest_store::QuestStore,
    storage::StorageResult,
};

struct IndexSpec {
    collection: &'static str,
    name: &'static str,
    keys: Document,
    unique: bool,
}

/// Indexes backing every "at most one" rule of the data model.
fn index_specs() -> Vec<IndexSpec> {
    let unique = |collection, name, keys| IndexSpec {
        collection,
        name,
        keys,
        unique: true,
    };
    vec![
        unique(PlayerDocument::COLLECTION, "player_user_idx", doc! {"user_id": 1}),
        unique(TeamDocument::COLLECTION, "team_name_idx", doc! {"name": 1}),
        unique(
            CheckedGameDocument::COLLECTION,
            "checked_game_def_idx",
            doc! {"game_def_id": 1},
        ),
        unique(
            RegistrationDocument::COLLECTION,
            "registration_pair_idx",
            doc! {"team_id": 1, "game_def_id": 1},
        ),
        unique(
            CurrentGameDocument::COLLECTION,
            "current_game_team_idx",
            doc! {"team_id": 1},
        ),
        unique(
            AttemptDocument::COLLECTION,
            "game_registration_quest_idx",
            doc! {"registration_id": 1, "quest_id": 1},
        ),
        unique(FinishedDocument::COLLECTION, "finished_game_idx", doc! {"game_id": 1}),
        unique(
            ScoreDocument::COLLECTION,
            "score_finished_idx",
            doc! {"game_finished_id": 1},
        ),
        unique(
            FixJudgeDocument::COLLECTION,
            "fix_judge_pair_idx",
            doc! {"team_id": 1, "game_def_id": 1},
        ),
        unique(
            VideoShooterDocument::COLLECTION,
            "video_shooter_game_idx",
            doc! {"game_id": 1},
        ),
        unique(
            CompleteGameDocument::COLLECTION,
            "complete_game_pair_idx",
            doc! {"team_id": 1, "game_def_id": 1},
        ),
        IndexSpec {
            collection: QuestOrderDocument::COLLECTION,
            name: "quest_order_position_idx",
            keys: doc! {"game_def_id": 1, "position": 1},
            unique: false,
        },
    ]
}

fn id_list(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

/// MongoDB backed [`QuestStore`] with one collection per entity.
#[derive(Clone)]
pub struct MongoQuestStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuestStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        for spec in index_specs() {
            let model = IndexModel::builder()
                .keys(spec.keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(spec.name.to_owned()))
                        .unique(Some(spec.unique))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(spec.collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: spec.collection,
                    index: spec.name,
                    source,
                })?;
        }
        info!(database = %self.inner.config.database_name, "MongoDB indexes ensured");
        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<R: MongoRecord>(&self) -> Collection<R> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<R>(R::COLLECTION)
    }

    async fn raw_collection(&self, name: &'static str) -> Collection<Document> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<Document>(name)
    }

    async fn find_one<R: MongoRecord>(&self, filter: Document) -> MongoResult<Option<R::Entity>> {
        let collection = self.collection::<R>().await;
        collection
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: R::COLLECTION,
                source,
            })?
            .map(R::into_entity)
            .transpose()
    }

    async fn find_all<R: MongoRecord>(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> MongoResult<Vec<R::Entity>> {
        let collection = self.collection::<R>().await;
        let query = collection.find(filter);
        let query = match sort {
            Some(sort) => query.sort(sort),
            None => query,
        };
        let documents: Vec<R> = query
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: R::COLLECTION,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: R::COLLECTION,
                source,
            })?;
        documents.into_iter().map(R::into_entity).collect()
    }

    async fn count<R: MongoRecord>(&self, filter: Document) -> MongoResult<u64> {
        let collection = self.collection::<R>().await;
        collection
            .count_documents(filter)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: R::COLLECTION,
                source,
            })
    }

    async fn insert<R: MongoRecord>(&self, entity: R::Entity, key: String) -> MongoResult<()> {
        let collection = self.collection::<R>().await;
        collection
            .insert_one(R::from_entity(entity))
            .await
            .map_err(|source| MongoDaoError::from_write(R::COLLECTION, key, source))?;
        Ok(())
    }

    async fn upsert<R: MongoRecord>(
        &self,
        filter: Document,
        entity: R::Entity,
        key: String,
    ) -> MongoResult<()> {
        let collection = self.collection::<R>().await;
        collection
            .replace_one(filter, R::from_entity(entity))
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::from_write(R::COLLECTION, key, source))?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &'static str,
        filter: Document,
        update: Document,
    ) -> MongoResult<u64> {
        let result = self
            .raw_collection(collection)
            .await
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::Write { collection, source })?;
        Ok(result.modified_count)
    }

    async fn delete_many(&self, collection: &'static str, filter: Document) -> MongoResult<u64> {
        let result = self
            .raw_collection(collection)
            .await
            .delete_many(filter)
            .await
            .map_err(|source| MongoDaoError::Write { collection, source })?;
        Ok(result.deleted_count)
    }

    async fn save_complete_game(&self, complete: CompleteGameEntity) -> MongoResult<()> {
        let collection = CompleteGameDocument::COLLECTION;
        let key = format!("{}/{}", complete.team_id, complete.game_def_id);
        self.raw_collection(collection)
            .await
            .update_one(
                doc! {
                    "team_id": complete.team_id.to_string(),
                    "game_def_id": complete.game_def_id.to_string(),
                },
                doc! {
                    "$set": { "completed": complete.completed, "score": complete.score },
                    "$setOnInsert": { "_id": complete.id.to_string() },
                },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::from_write(collection, key, source))?;
        Ok(())
    }

    async fn take_video_shooter(&self, game_id: Uuid) -> MongoResult<Option<VideoShooterEntity>> {
        let collection = self.collection::<VideoShooterDocument>().await;
        collection
            .find_one_and_delete(doc! {"game_id": game_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: VideoShooterDocument::COLLECTION,
                source,
            })?
            .map(MongoRecord::into_entity)
            .transpose()
    }

    async fn delete_game_definition(&self, id: Uuid) -> MongoResult<bool> {
        let def_filter = doc! {"game_def_id": id.to_string()};
        let removed = self
            .delete_many(
                GameDefinitionDocument::COLLECTION,
                doc! {"_id": id.to_string()},
            )
            .await?;
        if removed == 0 {
            return Ok(false);
        }

        for collection in [
            QuestOrderDocument::COLLECTION,
            CheckedGameDocument::COLLECTION,
            CurrentGameDocument::COLLECTION,
            CompleteGameDocument::COLLECTION,
        ] {
            self.delete_many(collection, def_filter.clone()).await?;
        }

        let registration_ids: Vec<Uuid> = self
            .find_all::<RegistrationDocument>(def_filter.clone(), None)
            .await?
            .into_iter()
            .map(|reg| reg.id)
            .collect();
        self.delete_many(RegistrationDocument::COLLECTION, def_filter.clone())
            .await?;

        let attempt_ids: Vec<Uuid> = self
            .find_all::<AttemptDocument>(
                doc! {"registration_id": {"$in": id_list(&registration_ids)}},
                None,
            )
            .await?
            .into_iter()
            .map(|attempt| attempt.id)
            .collect();
        let by_game = doc! {"game_id": {"$in": id_list(&attempt_ids)}};
        self.delete_many(
            AttemptDocument::COLLECTION,
            doc! {"_id": {"$in": id_list(&attempt_ids)}},
        )
        .await?;
        self.delete_many(VideoShooterDocument::COLLECTION, by_game.clone())
            .await?;

        let finished_ids: Vec<Uuid> = self
            .find_all::<FinishedDocument>(by_game.clone(), None)
            .await?
            .into_iter()
            .map(|finished| finished.id)
            .collect();
        self.delete_many(FinishedDocument::COLLECTION, by_game).await?;

        let judge_ids: Vec<Uuid> = self
            .find_all::<FixJudgeDocument>(def_filter.clone(), None)
            .await?
            .into_iter()
            .map(|judge| judge.id)
            .collect();
        self.delete_many(FixJudgeDocument::COLLECTION, def_filter)
            .await?;

        self.delete_many(
            ScoreDocument::COLLECTION,
            doc! {"$or": [
                {"game_finished_id": {"$in": id_list(&finished_ids)}},
                {"fix_judge_id": {"$in": id_list(&judge_ids)}},
            ]},
        )
        .await?;

        Ok(true)
    }
}

impl QuestStore for MongoQuestStore {
    fn find_player(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerDataEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<PlayerDocument>(doc! {"user_id": user_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<PlayerDocument>(doc! {}, Some(doc! {"joined_at": 1}))
                .await
                .map_err(Into::into)
        })
    }

    fn list_team_members(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerDataEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<PlayerDocument>(
                    doc! {"team_id": team_id.to_string()},
                    Some(doc! {"joined_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn save_player(&self, player: PlayerDataEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = player.user_id.to_string();
            store
                .upsert::<PlayerDocument>(doc! {"user_id": key.as_str()}, player, key.clone())
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<TeamDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<TeamDocument>(doc! {}, Some(doc! {"created_at": 1}))
                .await
                .map_err(Into::into)
        })
    }

    fn find_team_by_name(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<TeamDocument>(doc! {"name": name})
                .await
                .map_err(Into::into)
        })
    }

    fn create_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = team.name.clone();
            store
                .insert::<TeamDocument>(team, key)
                .await
                .map_err(Into::into)
        })
    }

    fn set_team_creator(
        &self,
        team_id: Uuid,
        creator: Option<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(
                    TeamDocument::COLLECTION,
                    doc! {"_id": team_id.to_string()},
                    doc! {"$set": {"creator_user_id": creator.map(|id| id.to_string())}},
                )
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }

    fn find_game_definition(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<GameDefinitionDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_game_definitions(
        &self,
    ) -> BoxFuture<'static, StorageResult<Vec<GameDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<GameDefinitionDocument>(doc! {}, Some(doc! {"date_begin": 1}))
                .await
                .map_err(Into::into)
        })
    }

    fn create_game_definition(
        &self,
        definition: GameDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = definition.id.to_string();
            store
                .insert::<GameDefinitionDocument>(definition, key)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_game_definition(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game_definition(id).await.map_err(Into::into) })
    }

    fn find_quest(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<QuestDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_quest(&self, quest: QuestEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = quest.id.to_string();
            store
                .insert::<QuestDocument>(quest, key)
                .await
                .map_err(Into::into)
        })
    }

    fn find_mark(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MarkEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<MarkDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_mark(&self, mark: MarkEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = mark.id.to_string();
            store
                .insert::<MarkDocument>(mark, key)
                .await
                .map_err(Into::into)
        })
    }

    fn list_quest_order(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestOrderEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<QuestOrderDocument>(
                    doc! {"game_def_id": game_def_id.to_string()},
                    Some(doc! {"position": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn create_quest_order(&self, entry: QuestOrderEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = entry.id.to_string();
            store
                .insert::<QuestOrderDocument>(entry, key)
                .await
                .map_err(Into::into)
        })
    }

    fn find_checked_game(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CheckedGameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<CheckedGameDocument>(doc! {"game_def_id": game_def_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_checked_game(
        &self,
        checked: CheckedGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = checked.game_def_id.to_string();
            store
                .insert::<CheckedGameDocument>(checked, key)
                .await
                .map_err(Into::into)
        })
    }

    fn find_registration(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RegistrationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<RegistrationDocument>(doc! {
                    "team_id": team_id.to_string(),
                    "game_def_id": game_def_id.to_string(),
                })
                .await
                .map_err(Into::into)
        })
    }

    fn list_registrations_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<RegistrationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<RegistrationDocument>(
                    doc! {"team_id": team_id.to_string()},
                    Some(doc! {"created_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn count_registrations_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count::<RegistrationDocument>(doc! {"game_def_id": game_def_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_registration(
        &self,
        registration: RegistrationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!("{}/{}", registration.team_id, registration.game_def_id);
            store
                .insert::<RegistrationDocument>(registration, key)
                .await
                .map_err(Into::into)
        })
    }

    fn list_current_games(&self) -> BoxFuture<'static, StorageResult<Vec<CurrentGameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<CurrentGameDocument>(doc! {}, Some(doc! {"created_at": 1}))
                .await
                .map_err(Into::into)
        })
    }

    fn find_current_game_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CurrentGameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<CurrentGameDocument>(doc! {"team_id": team_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_current_game(
        &self,
        current: CurrentGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = current.team_id.to_string();
            store
                .insert::<CurrentGameDocument>(current, key)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_current_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_many(
                    CurrentGameDocument::COLLECTION,
                    doc! {"team_id": team_id.to_string(), "game_def_id": game_def_id.to_string()},
                )
                .await
                .map(|deleted| deleted > 0)
                .map_err(Into::into)
        })
    }

    fn find_attempt(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestAttemptEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<AttemptDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_attempts(
        &self,
        team_id: Uuid,
        registration_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestAttemptEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<AttemptDocument>(
                    doc! {
                        "team_id": team_id.to_string(),
                        "registration_id": registration_id.to_string(),
                    },
                    Some(doc! {"created_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn create_attempt(&self, attempt: QuestAttemptEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!("{}/{}", attempt.registration_id, attempt.quest_id);
            store
                .insert::<AttemptDocument>(attempt, key)
                .await
                .map_err(Into::into)
        })
    }

    fn reveal_attempt(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(
                    AttemptDocument::COLLECTION,
                    doc! {"_id": id.to_string(), "visible": false},
                    doc! {"$set": {"visible": true}},
                )
                .await
                .map(|modified| modified > 0)
                .map_err(Into::into)
        })
    }

    fn find_finished(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameFinishedEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<FinishedDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_finished(
        &self,
        game_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameFinishedEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<FinishedDocument>(
                    doc! {"game_id": {"$in": id_list(&game_ids)}},
                    Some(doc! {"finished_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn create_finished(
        &self,
        finished: GameFinishedEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = finished.game_id.to_string();
            store
                .insert::<FinishedDocument>(finished, key)
                .await
                .map_err(Into::into)
        })
    }

    fn list_scores(
        &self,
        game_finished_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<JudgeScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<ScoreDocument>(
                    doc! {"game_finished_id": {"$in": id_list(&game_finished_ids)}},
                    None,
                )
                .await
                .map_err(Into::into)
        })
    }

    fn create_score(&self, score: JudgeScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = score.game_finished_id.to_string();
            store
                .insert::<ScoreDocument>(score, key)
                .await
                .map_err(Into::into)
        })
    }

    fn find_fix_judge(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<FixJudgeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<FixJudgeDocument>(doc! {"_id": id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_fix_judges(&self) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<FixJudgeDocument>(doc! {}, Some(doc! {"created_at": 1}))
                .await
                .map_err(Into::into)
        })
    }

    fn list_fix_judges_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<FixJudgeDocument>(
                    doc! {"user_id": user_id.to_string()},
                    Some(doc! {"created_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn list_fix_judges_for_definition(
        &self,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<FixJudgeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<FixJudgeDocument>(
                    doc! {"game_def_id": game_def_id.to_string()},
                    Some(doc! {"created_at": 1}),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn create_fix_judge(&self, judge: FixJudgeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!("{}/{}", judge.team_id, judge.game_def_id);
            store
                .insert::<FixJudgeDocument>(judge, key)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_fix_judge(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_many(FixJudgeDocument::COLLECTION, doc! {"_id": id.to_string()})
                .await
                .map(|deleted| deleted > 0)
                .map_err(Into::into)
        })
    }

    fn find_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<VideoShooterDocument>(doc! {"game_id": game_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn create_video_shooter(
        &self,
        shooter: VideoShooterEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = shooter.game_id.to_string();
            store
                .insert::<VideoShooterDocument>(shooter, key)
                .await
                .map_err(Into::into)
        })
    }

    fn take_video_shooter(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VideoShooterEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.take_video_shooter(game_id).await.map_err(Into::into) })
    }

    fn find_coord(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerCoordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<CoordDocument>(doc! {"_id": user_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn save_coord(&self, coord: PlayerCoordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = coord.user_id.to_string();
            store
                .upsert::<CoordDocument>(doc! {"_id": key.as_str()}, coord, key.clone())
                .await
                .map_err(Into::into)
        })
    }

    fn find_complete_game(
        &self,
        team_id: Uuid,
        game_def_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompleteGameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_one::<CompleteGameDocument>(doc! {
                    "team_id": team_id.to_string(),
                    "game_def_id": game_def_id.to_string(),
                })
                .await
                .map_err(Into::into)
        })
    }

    fn list_complete_games_for_team(
        &self,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CompleteGameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_all::<CompleteGameDocument>(doc! {"team_id": team_id.to_string()}, None)
                .await
                .map_err(Into::into)
        })
    }

    fn save_complete_game(
        &self,
        complete: CompleteGameEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_complete_game(complete).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
