use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::PlayerEntity,
    dto::{format_system_time, game::GameSummary, validation::validate_player_name},
};

/// Payload used to register a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePlayerRequest {
    /// Display name; surrounding whitespace is dropped.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
}

/// Player record with its running statistics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub games_played: u32,
    pub rank_sum: i64,
    pub total_score: i64,
    pub sum_game_score: i64,
    pub avg_rank: f64,
    pub avg_pts: f64,
    pub avg_score: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            games_played: player.games_played,
            rank_sum: player.rank_sum,
            total_score: player.total_score,
            sum_game_score: player.sum_game_score,
            avg_rank: player.avg_rank,
            avg_pts: player.avg_pts,
            avg_score: player.avg_score,
            created_at: format_system_time(player.created_at),
            updated_at: format_system_time(player.updated_at),
        }
    }
}

/// A player together with every game they took part in, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerHistoryResponse {
    pub player: PlayerSummary,
    pub games: Vec<GameSummary>,
}
