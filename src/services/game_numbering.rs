//! Sequential game numbers.
//!
//! A new game gets the highest existing `game_no` plus one, or 1 for the first
//! game. Reading the maximum and inserting are two steps, so two writers can
//! compute the same number; the store's unique `game_no` constraint turns the
//! loser's insert into a conflict, and the loser re-reads and tries again.

use tracing::{debug, warn};

use crate::{
    dao::{
        ledger_store::LedgerStore,
        models::GameEntity,
        storage::StorageResult,
    },
    error::ServiceError,
};

/// Number the next game would receive right now.
pub async fn next_game_no(store: &dyn LedgerStore) -> StorageResult<u32> {
    let latest = store.find_latest_game().await?;
    Ok(latest.map_or(1, |game| game.game_no.saturating_add(1)))
}

/// Assign a number with `build` and insert the game, retrying on a taken number.
///
/// Gives up with [`ServiceError::Conflict`] after `max_attempts` contended tries.
pub async fn insert_numbered<F>(
    store: &dyn LedgerStore,
    max_attempts: u32,
    build: F,
) -> Result<GameEntity, ServiceError>
where
    F: Fn(u32) -> GameEntity,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let game_no = next_game_no(store).await?;
        let game = build(game_no);

        match store.insert_game(game.clone()).await {
            Ok(()) => {
                debug!(game_no, attempt, "game number assigned");
                return Ok(game);
            }
            Err(err) if err.is_conflict() && attempt < max_attempts => {
                warn!(game_no, attempt, "game number already taken; retrying");
            }
            Err(err) if err.is_conflict() => {
                return Err(ServiceError::Conflict(format!(
                    "could not assign a game number after {attempt} attempt(s)"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::dao::{
        ledger_store::{flaky::FlakyLedgerStore, memory::InMemoryLedgerStore},
        models::{ScoreEntryEntity, Seat},
    };

    fn build(game_no: u32) -> GameEntity {
        let now = SystemTime::now();
        GameEntity {
            id: Uuid::new_v4(),
            game_no,
            scores: std::array::from_fn(|i| ScoreEntryEntity {
                player_id: Uuid::new_v4(),
                rank: i as u8 + 1,
                score: 25_000,
                seat: Seat::East,
                points_diff: 0,
            }),
            winner: String::new(),
            played_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn first_game_is_number_one() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(next_game_no(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sequential_inserts_count_up() {
        let store = InMemoryLedgerStore::new();
        let mut numbers = Vec::new();
        for _ in 0..3 {
            numbers.push(insert_numbered(&store, 5, build).await.unwrap().game_no);
        }
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn gaps_are_not_refilled() {
        let store = InMemoryLedgerStore::new();
        let first = insert_numbered(&store, 5, build).await.unwrap();
        insert_numbered(&store, 5, build).await.unwrap();
        insert_numbered(&store, 5, build).await.unwrap();

        LedgerStore::find_and_delete_game(&store, first.id)
            .await
            .unwrap();
        assert_eq!(next_game_no(&store).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn lost_race_retries_with_fresh_maximum() {
        let store = FlakyLedgerStore::new(InMemoryLedgerStore::new());
        insert_numbered(&store, 5, build).await.unwrap();

        store.stale_latest_reads(1);
        let game = insert_numbered(&store, 5, build).await.unwrap();
        assert_eq!(game.game_no, 2);
    }

    #[tokio::test]
    async fn persistent_contention_reports_conflict() {
        let store = FlakyLedgerStore::new(InMemoryLedgerStore::new());
        insert_numbered(&store, 5, build).await.unwrap();

        store.stale_latest_reads(10);
        let err = insert_numbered(&store, 3, build).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.list_games().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn backend_failure_is_not_retried() {
        let store = FlakyLedgerStore::new(InMemoryLedgerStore::new());
        store.fail_game_inserts();

        let err = insert_numbered(&store, 5, build).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}
