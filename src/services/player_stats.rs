//! Player statistics ledger: per-entry arithmetic and the per-game fan-out
//! that pushes a game's entries onto (or off) its four players.

use std::time::SystemTime;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    ledger_store::LedgerStore,
    models::{
        FailedPlayerUpdateEntity, GameEntity, PlayerEntity, ScoreEntryEntity, StatsOperation,
    },
    storage::StorageError,
};

/// A ledger sum would leave the `i64` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("player statistics would overflow")]
pub struct LedgerOverflow;

impl PlayerEntity {
    /// Add one game entry to the ledger and refresh the averages.
    ///
    /// On overflow the ledger is left untouched.
    pub fn apply_entry(
        &mut self,
        entry: &ScoreEntryEntity,
        now: SystemTime,
    ) -> Result<(), LedgerOverflow> {
        let rank_sum = self.rank_sum.checked_add(i64::from(entry.rank));
        let total_score = self.total_score.checked_add(entry.points_diff);
        let sum_game_score = self.sum_game_score.checked_add(entry.score);
        self.commit(rank_sum, total_score, sum_game_score)?;
        self.games_played = self.games_played.saturating_add(1);
        self.recompute_averages();
        self.updated_at = now;
        Ok(())
    }

    /// Remove one game entry from the ledger and refresh the averages.
    ///
    /// `games_played` never drops below zero. On overflow the ledger is left
    /// untouched.
    pub fn revert_entry(
        &mut self,
        entry: &ScoreEntryEntity,
        now: SystemTime,
    ) -> Result<(), LedgerOverflow> {
        let rank_sum = self.rank_sum.checked_sub(i64::from(entry.rank));
        let total_score = self.total_score.checked_sub(entry.points_diff);
        let sum_game_score = self.sum_game_score.checked_sub(entry.score);
        self.commit(rank_sum, total_score, sum_game_score)?;
        self.games_played = self.games_played.saturating_sub(1);
        self.recompute_averages();
        self.updated_at = now;
        Ok(())
    }

    fn commit(
        &mut self,
        rank_sum: Option<i64>,
        total_score: Option<i64>,
        sum_game_score: Option<i64>,
    ) -> Result<(), LedgerOverflow> {
        let (Some(rank_sum), Some(total_score), Some(sum_game_score)) =
            (rank_sum, total_score, sum_game_score)
        else {
            return Err(LedgerOverflow);
        };
        self.rank_sum = rank_sum;
        self.total_score = total_score;
        self.sum_game_score = sum_game_score;
        Ok(())
    }

    /// Derive the averages from the sums and count; all zero without games.
    pub fn recompute_averages(&mut self) {
        if self.games_played == 0 {
            self.avg_rank = 0.0;
            self.avg_pts = 0.0;
            self.avg_score = 0.0;
            return;
        }

        let games = f64::from(self.games_played);
        self.avg_rank = self.rank_sum as f64 / games;
        self.avg_pts = self.total_score as f64 / games;
        self.avg_score = self.sum_game_score as f64 / games;
    }
}

/// Why a single player's update did not land.
#[derive(Debug, Error)]
pub enum PlayerUpdateError {
    #[error("player record not found")]
    Missing,
    #[error(transparent)]
    Overflow(#[from] LedgerOverflow),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A player update that failed during a fan-out.
#[derive(Debug)]
pub struct FailedUpdate {
    pub player_id: Uuid,
    pub error: PlayerUpdateError,
}

/// Outcome of pushing one game onto its players.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Players whose ledger was written.
    pub applied: Vec<Uuid>,
    /// Players that no longer exist and were skipped on revert.
    pub skipped: Vec<Uuid>,
    /// Players whose update failed.
    pub failed: Vec<FailedUpdate>,
}

impl FanOutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Game and player aggregates diverged: the game record changed but not every
/// participant's ledger followed.
#[derive(Debug, Clone, Error)]
#[error(
    "game #{game_no} (`{game_id}`): {} player statistics update(s) failed during {operation}",
    .failed.len()
)]
pub struct PartialUpdateFailure {
    pub game_id: Uuid,
    pub game_no: u32,
    pub operation: StatsOperation,
    pub failed: Vec<FailedPlayerUpdateEntity>,
    /// Whether a reconciliation marker was durably recorded.
    pub marker_recorded: bool,
}

enum UpdateOutcome {
    Applied,
    Skipped,
}

/// Add every entry of a freshly persisted game to its players.
///
/// The four updates run concurrently and are all awaited. A missing player is
/// a failure here.
pub async fn apply_game(store: &dyn LedgerStore, game: &GameEntity) -> FanOutReport {
    fan_out(store, game, StatsOperation::Apply).await
}

/// Subtract every entry of a game about to be deleted from its players.
///
/// Players that no longer exist are skipped silently: there is no ledger left
/// to correct.
pub async fn revert_game(store: &dyn LedgerStore, game: &GameEntity) -> FanOutReport {
    fan_out(store, game, StatsOperation::Revert).await
}

async fn fan_out(
    store: &dyn LedgerStore,
    game: &GameEntity,
    operation: StatsOperation,
) -> FanOutReport {
    let now = SystemTime::now();
    let updates = game
        .scores
        .iter()
        .map(|entry| update_player(store, entry, operation, now));
    let outcomes = join_all(updates).await;

    let mut report = FanOutReport::default();
    for (entry, outcome) in game.scores.iter().zip(outcomes) {
        match outcome {
            Ok(UpdateOutcome::Applied) => report.applied.push(entry.player_id),
            Ok(UpdateOutcome::Skipped) => {
                debug!(
                    game_no = game.game_no,
                    player_id = %entry.player_id,
                    "player no longer exists; skipping statistics revert"
                );
                report.skipped.push(entry.player_id);
            }
            Err(error) => {
                warn!(
                    game_no = game.game_no,
                    player_id = %entry.player_id,
                    %operation,
                    %error,
                    "player statistics update failed"
                );
                report.failed.push(FailedUpdate {
                    player_id: entry.player_id,
                    error,
                });
            }
        }
    }
    report
}

async fn update_player(
    store: &dyn LedgerStore,
    entry: &ScoreEntryEntity,
    operation: StatsOperation,
    now: SystemTime,
) -> Result<UpdateOutcome, PlayerUpdateError> {
    let Some(mut player) = store.find_player(entry.player_id).await? else {
        return missing(operation);
    };

    match operation {
        StatsOperation::Apply => player.apply_entry(entry, now)?,
        StatsOperation::Revert => player.revert_entry(entry, now)?,
    }

    // The player may have been removed between the read and the write.
    if !store.save_player(player).await? {
        return missing(operation);
    }
    Ok(UpdateOutcome::Applied)
}

fn missing(operation: StatsOperation) -> Result<UpdateOutcome, PlayerUpdateError> {
    match operation {
        StatsOperation::Apply => Err(PlayerUpdateError::Missing),
        StatsOperation::Revert => Ok(UpdateOutcome::Skipped),
    }
}
