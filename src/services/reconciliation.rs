//! Durable markers for games whose player statistics did not fully follow.

use std::time::SystemTime;

use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    dao::{
        ledger_store::LedgerStore,
        models::{FailedPlayerUpdateEntity, GameEntity, ReconciliationEntity, StatsOperation},
    },
    error::ServiceError,
    services::player_stats::{FailedUpdate, PartialUpdateFailure},
    state::SharedState,
};

/// Reasons for every failed update of a fan-out, in marker form.
pub fn describe_failures(failed: &[FailedUpdate]) -> Vec<FailedPlayerUpdateEntity> {
    failed
        .iter()
        .map(|update| FailedPlayerUpdateEntity {
            player_id: update.player_id,
            reason: update.error.to_string(),
        })
        .collect()
}

/// Record a marker saying `failures` no longer agree with `game`.
///
/// Always returns the failure to surface to the caller; `marker_recorded`
/// tells whether the marker itself was persisted.
pub async fn record_divergence(
    store: &dyn LedgerStore,
    game: &GameEntity,
    operation: StatsOperation,
    failures: Vec<FailedPlayerUpdateEntity>,
) -> PartialUpdateFailure {
    let marker = ReconciliationEntity {
        id: Uuid::new_v4(),
        game_id: game.id,
        game_no: game.game_no,
        operation,
        failures: failures.clone(),
        created_at: SystemTime::now(),
    };

    let marker_recorded = match store.record_reconciliation(marker).await {
        Ok(()) => {
            warn!(
                game_id = %game.id,
                game_no = game.game_no,
                %operation,
                failed = failures.len(),
                "player statistics diverged; reconciliation marker recorded"
            );
            true
        }
        Err(err) => {
            error!(
                game_id = %game.id,
                game_no = game.game_no,
                %operation,
                failed = failures.len(),
                error = %err,
                "player statistics diverged and the reconciliation marker could not be recorded"
            );
            false
        }
    };

    PartialUpdateFailure {
        game_id: game.id,
        game_no: game.game_no,
        operation,
        failed: failures,
        marker_recorded,
    }
}

/// All outstanding markers, oldest first.
pub async fn list_reconciliations(
    state: &SharedState,
) -> Result<Vec<ReconciliationEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.list_reconciliations().await?)
}
