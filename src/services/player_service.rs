use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::PlayerEntity,
    dto::{
        player::{CreatePlayerRequest, PlayerHistoryResponse, PlayerSummary},
        validation::validate_player_name,
    },
    error::ServiceError,
    state::SharedState,
};

/// Register a player with an empty statistics ledger.
pub async fn create_player(
    state: &SharedState,
    request: CreatePlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    let name = request.name.trim();
    validate_player_name(name).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let store = state.require_store().await?;
    let player = PlayerEntity::new(name.to_string(), SystemTime::now());
    store
        .insert_player(player.clone())
        .await
        .map_err(|err| {
            if err.is_conflict() {
                ServiceError::Conflict(format!("player name `{}` is already taken", player.name))
            } else {
                err.into()
            }
        })?;

    info!(player_id = %player.id, name = %player.name, "player created");
    Ok(player.into())
}

pub async fn get_player(state: &SharedState, id: Uuid) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_player(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{id}` not found")))
}

/// All players sorted by name.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_store().await?;
    let players = store.list_players().await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Remove a player record. Games they took part in are kept untouched.
///
/// Holds the write gate so the removal cannot interleave with a game's
/// statistics fan-out.
pub async fn delete_player(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let _gate = state.write_gate().lock().await;
    if !store.delete_player(id).await? {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    }
    info!(player_id = %id, "player deleted");
    Ok(())
}

/// A player and every game holding one of their score entries, newest first.
pub async fn player_history(
    state: &SharedState,
    id: Uuid,
) -> Result<PlayerHistoryResponse, ServiceError> {
    let store = state.require_store().await?;
    let Some(player) = store.find_player(id).await? else {
        return Err(ServiceError::NotFound(format!("player `{id}` not found")));
    };
    let games = store.list_games_for_player(id).await?;

    Ok(PlayerHistoryResponse {
        player: player.into(),
        games: games.into_iter().map(Into::into).collect(),
    })
}
