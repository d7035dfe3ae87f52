//! Process-local [`LedgerStore`] used by tests and by the `memory` storage setting.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    ledger_store::LedgerStore,
    models::{GameEntity, PlayerEntity, ReconciliationEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    games: HashMap<Uuid, GameEntity>,
    players: HashMap<Uuid, PlayerEntity>,
    reconciliations: Vec<ReconciliationEntity>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_game(&self, game: GameEntity) -> StorageResult<()> {
        let mut state = self.inner.write().await;
        if state.games.contains_key(&game.id) {
            return Err(StorageError::conflict(format!(
                "game `{}` already exists",
                game.id
            )));
        }
        if state
            .games
            .values()
            .any(|existing| existing.game_no == game.game_no)
        {
            return Err(StorageError::conflict(format!(
                "game number {} already taken",
                game.game_no
            )));
        }
        state.games.insert(game.id, game);
        Ok(())
    }

    async fn games_sorted(&self, filter: impl Fn(&GameEntity) -> bool) -> Vec<GameEntity> {
        let state = self.inner.read().await;
        let mut games = state
            .games
            .values()
            .filter(|game| filter(game))
            .cloned()
            .collect::<Vec<_>>();
        games.sort_unstable_by(|a, b| b.game_no.cmp(&a.game_no));
        games
    }

    async fn insert_player(&self, player: PlayerEntity) -> StorageResult<()> {
        let mut state = self.inner.write().await;
        if state
            .players
            .values()
            .any(|existing| existing.id == player.id || existing.name == player.name)
        {
            return Err(StorageError::conflict(format!(
                "player `{}` already exists",
                player.name
            )));
        }
        state.players.insert(player.id, player);
        Ok(())
    }

    async fn save_player(&self, player: PlayerEntity) -> StorageResult<bool> {
        let mut state = self.inner.write().await;
        match state.players.get_mut(&player.id) {
            Some(slot) => {
                *slot = player;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.games.get(&id).cloned()) })
    }

    fn find_latest_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.read().await;
            Ok(state.games.values().max_by_key(|game| game.game_no).cloned())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.games_sorted(|_| true).await) })
    }

    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.games_sorted(|game| game.involves(player_id)).await) })
    }

    fn find_and_delete_game(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.write().await.games.remove(&id)) })
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_player(player).await })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.players.get(&id).cloned()) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(player).await })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.read().await;
            let mut players = state.players.values().cloned().collect::<Vec<_>>();
            players.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(players)
        })
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.write().await.players.remove(&id).is_some()) })
    }

    fn record_reconciliation(
        &self,
        marker: ReconciliationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.write().await.reconciliations.push(marker);
            Ok(())
        })
    }

    fn list_reconciliations(&self) -> BoxFuture<'static, StorageResult<Vec<ReconciliationEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.read().await.reconciliations.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
