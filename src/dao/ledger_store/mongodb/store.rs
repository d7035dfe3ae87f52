use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::open_ledger_database,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameDocument, MongoPlayerDocument, MongoReconciliationDocument, doc_id},
};
use crate::dao::{
    ledger_store::LedgerStore,
    models::{GameEntity, PlayerEntity, ReconciliationEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const PLAYER_COLLECTION_NAME: &str = "players";
const RECONCILIATION_COLLECTION_NAME: &str = "reconciliations";

#[derive(Clone)]
pub struct MongoLedgerStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
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
        let database = open_ledger_database(&self.config).await?;
        self.state.write().await.database = database;
        info!("MongoDB connection re-established");
        Ok(())
    }
}

impl MongoLedgerStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = open_ledger_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // The unique game number index is what turns a concurrent max+1 race
        // into a retryable conflict.
        let games = database.collection::<mongodb::bson::Document>(GAME_COLLECTION_NAME);
        let game_no_index = IndexModel::builder()
            .keys(doc! {"game_no": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_no_unique_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        games
            .create_index(game_no_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "game_no",
                source,
            })?;

        let participant_index = IndexModel::builder()
            .keys(doc! {"scores.player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_player_idx".to_owned()))
                    .build(),
            )
            .build();
        games
            .create_index(participant_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "scores.player_id",
                source,
            })?;

        let players = database.collection::<mongodb::bson::Document>(PLAYER_COLLECTION_NAME);
        let name_index = IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_name_unique_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        players
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "name",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    async fn reconciliations(&self) -> Collection<MongoReconciliationDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoReconciliationDocument>(RECONCILIATION_COLLECTION_NAME)
    }

    async fn insert_game(&self, game: GameEntity) -> MongoResult<()> {
        let game_no = game.game_no;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertGame { game_no, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;

        document.map(GameEntity::try_from).transpose()
    }

    async fn find_latest_game(&self) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc! {})
            .sort(doc! {"game_no": -1})
            .await
            .map_err(|source| MongoDaoError::LoadLatestGame { source })?;

        document.map(GameEntity::try_from).transpose()
    }

    async fn list_games(&self, filter: mongodb::bson::Document) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(filter)
            .sort(doc! {"game_no": -1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents.into_iter().map(GameEntity::try_from).collect()
    }

    async fn find_and_delete_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one_and_delete(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;

        document.map(GameEntity::try_from).transpose()
    }

    async fn insert_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let name = player.name.clone();
        let document: MongoPlayerDocument = player.into();
        self.players()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertPlayer { name, source })?;
        Ok(())
    }

    async fn find_player(&self, id: Uuid) -> MongoResult<Option<PlayerEntity>> {
        let document = self
            .players()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { id, source })?;

        document.map(PlayerEntity::try_from).transpose()
    }

    async fn save_player(&self, player: PlayerEntity) -> MongoResult<bool> {
        let id = player.id;
        let document: MongoPlayerDocument = player.into();
        let result = self
            .players()
            .await
            .replace_one(doc_id(id), &document)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn list_players(&self) -> MongoResult<Vec<PlayerEntity>> {
        let documents: Vec<MongoPlayerDocument> = self
            .players()
            .await
            .find(doc! {})
            .sort(doc! {"name": 1})
            .await
            .map_err(|source| MongoDaoError::ListPlayers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPlayers { source })?;

        documents.into_iter().map(PlayerEntity::try_from).collect()
    }

    async fn delete_player(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .players()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeletePlayer { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn record_reconciliation(&self, marker: ReconciliationEntity) -> MongoResult<()> {
        let game_id = marker.game_id;
        let document: MongoReconciliationDocument = marker.into();
        self.reconciliations()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::RecordReconciliation { game_id, source })?;
        Ok(())
    }

    async fn list_reconciliations(&self) -> MongoResult<Vec<ReconciliationEntity>> {
        let documents: Vec<MongoReconciliationDocument> = self
            .reconciliations()
            .await
            .find(doc! {})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListReconciliations { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListReconciliations { source })?;

        documents
            .into_iter()
            .map(ReconciliationEntity::try_from)
            .collect()
    }
}

impl LedgerStore for MongoLedgerStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_latest_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_latest_game().await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games(doc! {}).await.map_err(Into::into) })
    }

    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_games(doc! {"scores.player_id": player_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn find_and_delete_game(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_and_delete_game(id).await.map_err(Into::into) })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_player(player).await.map_err(Into::into) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(id).await.map_err(Into::into) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(player).await.map_err(Into::into) })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players().await.map_err(Into::into) })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(id).await.map_err(Into::into) })
    }

    fn record_reconciliation(
        &self,
        marker: ReconciliationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_reconciliation(marker).await.map_err(Into::into) })
    }

    fn list_reconciliations(&self) -> BoxFuture<'static, StorageResult<Vec<ReconciliationEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_reconciliations().await.map_err(Into::into) })
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
