#[cfg(test)]
pub(crate) mod flaky;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameEntity, PlayerEntity, ReconciliationEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games, players, and reconciliation markers.
///
/// Implementations must reject a game whose `game_no` is already taken with
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict), and a
/// player whose name is already taken likewise.
pub trait LedgerStore: Send + Sync {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Game holding the highest `game_no`, if any.
    fn find_latest_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// All games, highest `game_no` first.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Games holding a score entry for `player_id`, highest `game_no` first.
    fn list_games_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Remove a game and hand back the removed record.
    fn find_and_delete_game(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;

    fn insert_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Whole-record replacement of an existing player.
    ///
    /// Never creates a record: returns `false` when no player with that id
    /// exists any more.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// All players sorted by name.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn delete_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn record_reconciliation(
        &self,
        marker: ReconciliationEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Markers, oldest first.
    fn list_reconciliations(&self) -> BoxFuture<'static, StorageResult<Vec<ReconciliationEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
