use serde::{Deserialize, Serialize};
use std::{fmt, time::SystemTime};
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of seats, and therefore score entries, in every recorded game.
pub const SEATS_PER_TABLE: usize = 4;

/// Compass-labelled seat a player occupied at the table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    East,
    South,
    West,
    North,
}

/// Player record holding the running statistics ledger.
///
/// `games_played` and the three sums are only ever moved by game creation and
/// deletion; the averages are derived from them and stored for cheap reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name, unique across players.
    pub name: String,
    /// Number of games the player took part in.
    pub games_played: u32,
    /// Sum of the player's ranks across games.
    pub rank_sum: i64,
    /// Sum of the points differential across games.
    pub total_score: i64,
    /// Sum of the raw table scores across games.
    pub sum_game_score: i64,
    /// `rank_sum / games_played`, 0 without games.
    pub avg_rank: f64,
    /// `total_score / games_played`, 0 without games.
    pub avg_pts: f64,
    /// `sum_game_score / games_played`, 0 without games.
    pub avg_score: f64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the ledger fields moved.
    pub updated_at: SystemTime,
}

impl PlayerEntity {
    /// Fresh player with an empty ledger.
    pub fn new(name: String, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            games_played: 0,
            rank_sum: 0,
            total_score: 0,
            sum_game_score: 0,
            avg_rank: 0.0,
            avg_pts: 0.0,
            avg_score: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One seat's outcome inside a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntryEntity {
    /// Player who occupied the seat.
    pub player_id: Uuid,
    /// Placement in the game, 1 to 4.
    pub rank: u8,
    /// Raw table score at the end of the game.
    pub score: i64,
    /// Seat wind.
    pub seat: Seat,
    /// Signed value applied to the player's `total_score`.
    pub points_diff: i64,
}

/// Game submitted by a client, before it is numbered and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCandidate {
    /// The four seat outcomes.
    pub scores: [ScoreEntryEntity; SEATS_PER_TABLE],
    /// Winner label; defaults to the rank 1 player's name when absent.
    pub winner: Option<String>,
    /// When the game was played; defaults to the submission time.
    pub played_at: Option<SystemTime>,
}

/// Persisted game record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Sequential number assigned once at creation.
    pub game_no: u32,
    /// The four seat outcomes.
    pub scores: [ScoreEntryEntity; SEATS_PER_TABLE],
    /// Winner label.
    pub winner: String,
    /// When the game was played.
    pub played_at: SystemTime,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last update timestamp.
    pub updated_at: SystemTime,
}

impl GameEntity {
    /// Identifiers of the participating players, in seat entry order.
    pub fn player_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.scores.iter().map(|entry| entry.player_id)
    }

    /// Whether `player_id` holds one of the score entries.
    pub fn involves(&self, player_id: Uuid) -> bool {
        self.player_ids().any(|id| id == player_id)
    }
}

/// Direction of a statistics fan-out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatsOperation {
    /// Game creation adding its entries to the players.
    Apply,
    /// Game deletion subtracting its entries from the players.
    Revert,
}

impl fmt::Display for StatsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsOperation::Apply => f.write_str("apply"),
            StatsOperation::Revert => f.write_str("revert"),
        }
    }
}

/// A player update that did not land during a fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedPlayerUpdateEntity {
    pub player_id: Uuid,
    pub reason: String,
}

/// Durable marker left behind when game and player aggregates diverged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconciliationEntity {
    /// Primary key of the marker.
    pub id: Uuid,
    /// Game whose fan-out was incomplete.
    pub game_id: Uuid,
    /// Number of that game.
    pub game_no: u32,
    /// Whether the game was being created or deleted.
    pub operation: StatsOperation,
    /// Players whose ledger is out of step with the games collection.
    pub failures: Vec<FailedPlayerUpdateEntity>,
    /// When the divergence was detected.
    pub created_at: SystemTime,
}
