use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    FailedPlayerUpdateEntity, GameEntity, PlayerEntity, ReconciliationEntity, SEATS_PER_TABLE,
    ScoreEntryEntity, Seat, StatsOperation,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    game_no: i64,
    scores: Vec<MongoScoreDocument>,
    winner: String,
    played_at: DateTime,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    player_id: String,
    rank: i32,
    score: i64,
    seat: Seat,
    points_diff: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    games_played: i64,
    rank_sum: i64,
    total_score: i64,
    sum_game_score: i64,
    avg_rank: f64,
    avg_pts: f64,
    avg_score: f64,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoReconciliationDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    game_no: i64,
    operation: StatsOperation,
    failures: Vec<MongoFailedUpdateDocument>,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoFailedUpdateDocument {
    player_id: String,
    reason: String,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_no: i64::from(value.game_no),
            scores: value.scores.into_iter().map(Into::into).collect(),
            winner: value.winner,
            played_at: DateTime::from_system_time(value.played_at),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        let id = parse_id(&value.id, &value.id)?;
        let game_no = u32::try_from(value.game_no)
            .map_err(|_| malformed(&value.id, format!("game_no {} out of range", value.game_no)))?;

        let scores = value
            .scores
            .into_iter()
            .map(|score| score.into_entity(&value.id))
            .collect::<Result<Vec<_>, _>>()?;
        let count = scores.len();
        let scores: [ScoreEntryEntity; SEATS_PER_TABLE] = scores
            .try_into()
            .map_err(|_| malformed(&value.id, format!("expected {SEATS_PER_TABLE} score entries, got {count}")))?;

        Ok(Self {
            id,
            game_no,
            scores,
            winner: value.winner,
            played_at: value.played_at.to_system_time(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

impl From<ScoreEntryEntity> for MongoScoreDocument {
    fn from(value: ScoreEntryEntity) -> Self {
        Self {
            player_id: value.player_id.to_string(),
            rank: i32::from(value.rank),
            score: value.score,
            seat: value.seat,
            points_diff: value.points_diff,
        }
    }
}

impl MongoScoreDocument {
    fn into_entity(self, game_id: &str) -> Result<ScoreEntryEntity, MongoDaoError> {
        let rank = u8::try_from(self.rank)
            .map_err(|_| malformed(game_id, format!("rank {} out of range", self.rank)))?;
        Ok(ScoreEntryEntity {
            player_id: parse_id(game_id, &self.player_id)?,
            rank,
            score: self.score,
            seat: self.seat,
            points_diff: self.points_diff,
        })
    }
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            games_played: i64::from(value.games_played),
            rank_sum: value.rank_sum,
            total_score: value.total_score,
            sum_game_score: value.sum_game_score,
            avg_rank: value.avg_rank,
            avg_pts: value.avg_pts,
            avg_score: value.avg_score,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoPlayerDocument> for PlayerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlayerDocument) -> Result<Self, Self::Error> {
        let games_played = u32::try_from(value.games_played).map_err(|_| {
            malformed(
                &value.id,
                format!("games_played {} out of range", value.games_played),
            )
        })?;

        Ok(Self {
            id: parse_id(&value.id, &value.id)?,
            name: value.name,
            games_played,
            rank_sum: value.rank_sum,
            total_score: value.total_score,
            sum_game_score: value.sum_game_score,
            avg_rank: value.avg_rank,
            avg_pts: value.avg_pts,
            avg_score: value.avg_score,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

impl From<ReconciliationEntity> for MongoReconciliationDocument {
    fn from(value: ReconciliationEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            game_no: i64::from(value.game_no),
            operation: value.operation,
            failures: value
                .failures
                .into_iter()
                .map(|failure| MongoFailedUpdateDocument {
                    player_id: failure.player_id.to_string(),
                    reason: failure.reason,
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoReconciliationDocument> for ReconciliationEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoReconciliationDocument) -> Result<Self, Self::Error> {
        let failures = value
            .failures
            .into_iter()
            .map(|failure| {
                Ok(FailedPlayerUpdateEntity {
                    player_id: parse_id(&value.id, &failure.player_id)?,
                    reason: failure.reason,
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;

        Ok(Self {
            id: parse_id(&value.id, &value.id)?,
            game_id: parse_id(&value.id, &value.game_id)?,
            game_no: u32::try_from(value.game_no).map_err(|_| {
                malformed(&value.id, format!("game_no {} out of range", value.game_no))
            })?,
            operation: value.operation,
            failures,
            created_at: value.created_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_id(document_id: &str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| malformed(document_id, format!("invalid uuid `{raw}`: {err}")))
}

fn malformed(document_id: &str, reason: String) -> MongoDaoError {
    MongoDaoError::MalformedDocument {
        id: document_id.to_owned(),
        reason,
    }
}
