//! Failure-injecting store wrapper for exercising partial fan-out paths.

use std::{
    collections::HashSet,
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LedgerStore, memory::InMemoryLedgerStore};
use crate::dao::{
    models::{GameEntity, PlayerEntity, ReconciliationEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct FlakyLedgerStore {
    inner: InMemoryLedgerStore,
    failing_saves: Arc<RwLock<HashSet<Uuid>>>,
    vanishing_players: Arc<RwLock<HashSet<Uuid>>>,
    fail_markers: Arc<AtomicBool>,
    fail_game_inserts: Arc<AtomicBool>,
    stale_latest_reads: Arc<AtomicU32>,
}

impl FlakyLedgerStore {
    pub fn new(inner: InMemoryLedgerStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Make every `save_player` for `player_id` fail.
    pub async fn fail_saves_for(&self, player_id: Uuid) {
        self.failing_saves.write().await.insert(player_id);
    }

    /// Delete `player_id` right before its next `save_player`, as a player
    /// removal racing a statistics update would.
    pub async fn vanish_before_save(&self, player_id: Uuid) {
        self.vanishing_players.write().await.insert(player_id);
    }

    /// Make `record_reconciliation` fail.
    pub fn fail_markers(&self) {
        self.fail_markers.store(true, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `find_latest_game` miss every game, as a
    /// read racing a concurrent creation would.
    pub fn stale_latest_reads(&self, count: u32) {
        self.stale_latest_reads.store(count, Ordering::SeqCst);
    }

    /// Make `insert_game` fail as if the backend went away.
    pub fn fail_game_inserts(&self) {
        self.fail_game_inserts.store(true, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> StorageError {
    StorageError::unavailable(
        format!("injected {what} failure"),
        io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"),
    )
}

impl LedgerStore for FlakyLedgerStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_game_inserts.load(Ordering::SeqCst) {
            return Box::pin(async { Err(injected("game insert")) });
        }
        LedgerStore::insert_game(&self.inner, game)
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        LedgerStore::find_game(&self.inner, id)
    }

    fn find_latest_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let stale = self
            .stale_latest_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if stale {
            return Box::pin(async { Ok(None) });
        }
        self.inner.find_latest_game()
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        self.inner.list_games()
    }

    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        self.inner.list_games_for_player(player_id)
    }

    fn find_and_delete_game(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        self.inner.find_and_delete_game(id)
    }

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        LedgerStore::insert_player(&self.inner, player)
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        self.inner.find_player(id)
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            if store.failing_saves.read().await.contains(&player.id) {
                return Err(injected("player save"));
            }
            if store.vanishing_players.write().await.remove(&player.id) {
                LedgerStore::delete_player(&store.inner, player.id).await?;
            }
            LedgerStore::save_player(&store.inner, player).await
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        self.inner.list_players()
    }

    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.delete_player(id)
    }

    fn record_reconciliation(
        &self,
        marker: ReconciliationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_markers.load(Ordering::SeqCst) {
            return Box::pin(async { Err(injected("marker")) });
        }
        self.inner.record_reconciliation(marker)
    }

    fn list_reconciliations(&self) -> BoxFuture<'static, StorageResult<Vec<ReconciliationEntity>>> {
        self.inner.list_reconciliations()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
