use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{FailedPlayerUpdateEntity, ReconciliationEntity, StatsOperation},
    dto::format_system_time,
};

/// Game whose player statistics are out of step and need manual repair.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationSummary {
    pub id: Uuid,
    pub game_id: Uuid,
    pub game_no: u32,
    pub operation: StatsOperation,
    pub failures: Vec<FailedPlayerUpdateSummary>,
    pub created_at: String,
}

/// A player whose statistics update did not land.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FailedPlayerUpdateSummary {
    pub player_id: Uuid,
    pub reason: String,
}

impl From<FailedPlayerUpdateEntity> for FailedPlayerUpdateSummary {
    fn from(failure: FailedPlayerUpdateEntity) -> Self {
        Self {
            player_id: failure.player_id,
            reason: failure.reason,
        }
    }
}

impl From<ReconciliationEntity> for ReconciliationSummary {
    fn from(marker: ReconciliationEntity) -> Self {
        Self {
            id: marker.id,
            game_id: marker.game_id,
            game_no: marker.game_no,
            operation: marker.operation,
            failures: marker.failures.into_iter().map(Into::into).collect(),
            created_at: format_system_time(marker.created_at),
        }
    }
}
