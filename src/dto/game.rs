use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, ScoreEntryEntity, Seat},
    dto::{
        format_system_time,
        validation::{validate_entry_magnitude, validate_rfc3339},
    },
};

/// Payload submitted to record the result of one game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// One entry per seat; exactly four.
    #[validate(
        length(equal = 4, message = "a game must contain exactly four score entries"),
        nested
    )]
    pub scores: Vec<ScoreInput>,
    /// Winner label. Defaults to the name of the player ranked first.
    #[serde(default)]
    pub winner: Option<String>,
    /// RFC 3339 timestamp of the game. Defaults to the submission time.
    #[serde(default)]
    #[validate(custom(function = "validate_rfc3339"))]
    pub played_at: Option<String>,
}

/// One seat's result inside a submitted game.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ScoreInput {
    pub player_id: Uuid,
    /// Placement, 1 to 4.
    #[validate(range(min = 1, max = 4, message = "rank must be between 1 and 4"))]
    pub rank: u8,
    /// Raw table score; may be negative.
    #[validate(custom(function = "entry_magnitude"))]
    pub score: i64,
    pub seat: Seat,
    /// Signed amount added to the player's total score.
    #[validate(custom(function = "entry_magnitude"))]
    pub points_diff: i64,
}

// validator passes `Copy` fields by value; adapt to the by-reference helper.
fn entry_magnitude(value: i64) -> Result<(), validator::ValidationError> {
    validate_entry_magnitude(&value)
}

impl From<ScoreInput> for ScoreEntryEntity {
    fn from(input: ScoreInput) -> Self {
        Self {
            player_id: input.player_id,
            rank: input.rank,
            score: input.score,
            seat: input.seat,
            points_diff: input.points_diff,
        }
    }
}

/// Persisted game as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameSummary {
    pub id: Uuid,
    pub game_no: u32,
    pub scores: Vec<ScoreSummary>,
    pub winner: String,
    pub played_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One seat's result inside a persisted game.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScoreSummary {
    pub player_id: Uuid,
    pub rank: u8,
    pub score: i64,
    pub seat: Seat,
    pub points_diff: i64,
}

impl From<ScoreEntryEntity> for ScoreSummary {
    fn from(entry: ScoreEntryEntity) -> Self {
        Self {
            player_id: entry.player_id,
            rank: entry.rank,
            score: entry.score,
            seat: entry.seat,
            points_diff: entry.points_diff,
        }
    }
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            game_no: game.game_no,
            scores: game.scores.into_iter().map(Into::into).collect(),
            winner: game.winner,
            played_at: format_system_time(game.played_at),
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
        }
    }
}
