use std::time::SystemTime;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        ledger_store::LedgerStore,
        models::{
            FailedPlayerUpdateEntity, GameCandidate, GameEntity, SEATS_PER_TABLE,
            ScoreEntryEntity, StatsOperation,
        },
    },
    dto::{
        game::{CreateGameRequest, GameSummary},
        validation::{MAX_ENTRY_MAGNITUDE, parse_rfc3339},
    },
    error::ServiceError,
    services::{
        game_numbering::insert_numbered,
        game_validator::validate_scores,
        player_stats::{apply_game, revert_game},
        reconciliation::{describe_failures, record_divergence},
    },
    state::SharedState,
};

/// Record a finished game and push its results onto the four players.
///
/// Validation and the player existence check run before anything is written.
/// Once the game is stored, a failed player update no longer undoes it: the
/// divergence is recorded and reported as [`ServiceError::PartialUpdate`].
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_store().await?;
    let candidate = build_candidate(request)?;
    validate_scores(&candidate.scores, state.config().table_total)?;
    let winner = resolve_winner(store.as_ref(), &candidate).await?;

    let _gate = state.write_gate().lock().await;

    let now = SystemTime::now();
    let played_at = candidate.played_at.unwrap_or(now);
    let game = insert_numbered(
        store.as_ref(),
        state.config().game_no_max_attempts,
        |game_no| GameEntity {
            id: Uuid::new_v4(),
            game_no,
            scores: candidate.scores.clone(),
            winner: winner.clone(),
            played_at,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    info!(game_id = %game.id, game_no = game.game_no, winner = %game.winner, "game recorded");

    let report = apply_game(store.as_ref(), &game).await;
    if !report.is_complete() {
        let failure = record_divergence(
            store.as_ref(),
            &game,
            StatsOperation::Apply,
            describe_failures(&report.failed),
        )
        .await;
        return Err(failure.into());
    }

    Ok(game.into())
}

/// Remove a game after taking its results back off the players.
///
/// When no player ledger could be written the game is kept and the storage
/// error is returned. Once any ledger moved, the game is deleted and any
/// leftover failure is recorded and reported as [`ServiceError::PartialUpdate`].
pub async fn delete_game(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let _gate = state.write_gate().lock().await;

    let Some(game) = store.find_game(id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };

    let mut report = revert_game(store.as_ref(), &game).await;
    if report.applied.is_empty() && !report.failed.is_empty() {
        warn!(
            game_id = %id,
            game_no = game.game_no,
            "no player statistics reverted; keeping game"
        );
        return Err(report.failed.swap_remove(0).error.into());
    }

    let mut failures = describe_failures(&report.failed);
    match store.find_and_delete_game(id).await {
        Ok(Some(_)) => {
            info!(game_id = %id, game_no = game.game_no, "game deleted");
        }
        Ok(None) => {
            failures.extend(mark_reverted(
                &report.applied,
                "statistics reverted but the game had already been deleted",
            ));
        }
        Err(err) => {
            failures.extend(mark_reverted(
                &report.applied,
                &format!("statistics reverted but the game could not be deleted: {err}"),
            ));
        }
    }

    if failures.is_empty() {
        return Ok(());
    }

    let failure = record_divergence(store.as_ref(), &game, StatsOperation::Revert, failures).await;
    Err(failure.into())
}

/// Fetch a single game.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameSummary, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_game(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

/// Every game, newest first.
pub async fn list_games(state: &SharedState) -> Result<Vec<GameSummary>, ServiceError> {
    let store = state.require_store().await?;
    let games = store.list_games().await?;
    Ok(games.into_iter().map(Into::into).collect())
}

fn build_candidate(request: CreateGameRequest) -> Result<GameCandidate, ServiceError> {
    let CreateGameRequest {
        scores,
        winner,
        played_at,
    } = request;

    let count = scores.len();
    let entries: Vec<ScoreEntryEntity> = scores.into_iter().map(Into::into).collect();
    let scores: [ScoreEntryEntity; SEATS_PER_TABLE] = entries.try_into().map_err(|_| {
        ServiceError::InvalidInput(format!(
            "a game requires exactly {SEATS_PER_TABLE} score entries (got {count})"
        ))
    })?;

    if let Some(entry) = scores.iter().find(|entry| !(1..=4).contains(&entry.rank)) {
        return Err(ServiceError::InvalidInput(format!(
            "rank {} of player `{}` is outside 1..=4",
            entry.rank, entry.player_id
        )));
    }

    if let Some(entry) = scores.iter().find(|entry| {
        entry.score.unsigned_abs() > MAX_ENTRY_MAGNITUDE.unsigned_abs()
            || entry.points_diff.unsigned_abs() > MAX_ENTRY_MAGNITUDE.unsigned_abs()
    }) {
        return Err(ServiceError::InvalidInput(format!(
            "score and points_diff of player `{}` must stay within ±{MAX_ENTRY_MAGNITUDE}",
            entry.player_id
        )));
    }

    let played_at = match played_at {
        Some(raw) => Some(parse_rfc3339(&raw).ok_or_else(|| {
            ServiceError::InvalidInput(format!("played_at `{raw}` is not an RFC 3339 timestamp"))
        })?),
        None => None,
    };

    let winner = winner
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty());

    Ok(GameCandidate {
        scores,
        winner,
        played_at,
    })
}

/// Confirm every referenced player exists and settle the winner label.
async fn resolve_winner(
    store: &dyn LedgerStore,
    candidate: &GameCandidate,
) -> Result<String, ServiceError> {
    let lookups = candidate
        .scores
        .iter()
        .map(|entry| store.find_player(entry.player_id));
    let players = join_all(lookups).await;

    let mut missing = Vec::new();
    let mut found = Vec::with_capacity(SEATS_PER_TABLE);
    for (entry, lookup) in candidate.scores.iter().zip(players) {
        match lookup? {
            Some(player) => found.push((entry.rank, player.name)),
            None => missing.push(format!("`{}`", entry.player_id)),
        }
    }

    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "unknown player(s): {}",
            missing.join(", ")
        )));
    }

    if let Some(winner) = &candidate.winner {
        return Ok(winner.clone());
    }

    Ok(found
        .into_iter()
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, name)| name)
        .unwrap_or_default())
}

fn mark_reverted(applied: &[Uuid], reason: &str) -> Vec<FailedPlayerUpdateEntity> {
    applied
        .iter()
        .map(|player_id| FailedPlayerUpdateEntity {
            player_id: *player_id,
            reason: reason.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            ledger_store::{flaky::FlakyLedgerStore, memory::InMemoryLedgerStore},
            models::{PlayerEntity, Seat},
        },
        dto::game::ScoreInput,
        state::AppState,
    };

    const SCENARIO: [(u8, i64, i64); 4] = [
        (1, 40_000, 20_000),
        (2, 30_000, 10_000),
        (3, 20_000, -10_000),
        (4, 10_000, -20_000),
    ];

    fn request(player_ids: [Uuid; 4], rows: [(u8, i64, i64); 4]) -> CreateGameRequest {
        let seats = [Seat::East, Seat::South, Seat::West, Seat::North];
        CreateGameRequest {
            scores: (0..4)
                .map(|i| ScoreInput {
                    player_id: player_ids[i],
                    rank: rows[i].0,
                    score: rows[i].1,
                    seat: seats[i],
                    points_diff: rows[i].2,
                })
                .collect(),
            winner: None,
            played_at: None,
        }
    }

    async fn seed<S: LedgerStore>(store: &S) -> [PlayerEntity; 4] {
        let now = SystemTime::now();
        let players = ["P1", "P2", "P3", "P4"].map(|name| PlayerEntity::new(name.into(), now));
        for player in &players {
            store.insert_player(player.clone()).await.unwrap();
        }
        players
    }

    fn ids(players: &[PlayerEntity; 4]) -> [Uuid; 4] {
        std::array::from_fn(|i| players[i].id)
    }

    async fn setup() -> (SharedState, InMemoryLedgerStore, [PlayerEntity; 4]) {
        let store = InMemoryLedgerStore::new();
        let players = seed(&store).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone()));
        (state, store, players)
    }

    async fn player(store: &InMemoryLedgerStore, id: Uuid) -> PlayerEntity {
        LedgerStore::find_player(store, id).await.unwrap().unwrap()
    }

    fn assert_same_ledger(actual: &PlayerEntity, expected: &PlayerEntity) {
        assert_eq!(actual.games_played, expected.games_played);
        assert_eq!(actual.rank_sum, expected.rank_sum);
        assert_eq!(actual.total_score, expected.total_score);
        assert_eq!(actual.sum_game_score, expected.sum_game_score);
        assert_eq!(actual.avg_rank, expected.avg_rank);
        assert_eq!(actual.avg_pts, expected.avg_pts);
        assert_eq!(actual.avg_score, expected.avg_score);
    }

    #[tokio::test]
    async fn first_game_updates_every_player() {
        let (state, store, players) = setup().await;

        let game = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();
        assert_eq!(game.game_no, 1);
        assert_eq!(game.winner, "P1");

        let p1 = player(&store, players[0].id).await;
        assert_eq!(p1.games_played, 1);
        assert_eq!(p1.total_score, 20_000);
        assert_eq!(p1.avg_rank, 1.0);
        assert_eq!(p1.avg_pts, 20_000.0);
        assert_eq!(p1.avg_score, 40_000.0);

        let p4 = player(&store, players[3].id).await;
        assert_eq!(p4.rank_sum, 4);
        assert_eq!(p4.total_score, -20_000);
        assert!(store.list_reconciliations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn game_numbers_follow_the_highest_existing_number() {
        let (state, _store, players) = setup().await;

        let mut games = Vec::new();
        for _ in 0..3 {
            games.push(
                create_game(&state, request(ids(&players), SCENARIO))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(
            games.iter().map(|game| game.game_no).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        delete_game(&state, games[1].id).await.unwrap();
        let next = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();
        assert_eq!(next.game_no, 4);
    }

    #[tokio::test]
    async fn create_then_delete_restores_players_exactly() {
        let (state, store, players) = setup().await;
        let rows = [
            (2, 32_700, 12_700),
            (1, 41_300, 31_300),
            (4, 1_800, -38_200),
            (3, 24_200, -5_800),
        ];
        create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();

        let mut before = Vec::new();
        for p in &players {
            before.push(player(&store, p.id).await);
        }

        let game = create_game(&state, request(ids(&players), rows))
            .await
            .unwrap();
        delete_game(&state, game.id).await.unwrap();

        for (p, expected) in players.iter().zip(&before) {
            assert_same_ledger(&player(&store, p.id).await, expected);
        }
    }

    #[tokio::test]
    async fn deleting_the_only_game_zeroes_every_player() {
        let (state, store, players) = setup().await;
        let game = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();

        delete_game(&state, game.id).await.unwrap();

        for p in &players {
            assert_same_ledger(&player(&store, p.id).await, p);
        }
        assert!(store.list_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_score_sum_writes_nothing() {
        let (state, store, players) = setup().await;
        let mut rows = SCENARIO;
        rows[3].1 = 9_000;

        let err = create_game(&state, request(ids(&players), rows))
            .await
            .unwrap_err();
        let ServiceError::Validation(rejection) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(rejection.score_sum(), Some(99_000));

        assert!(store.list_games().await.unwrap().is_empty());
        for p in &players {
            assert_same_ledger(&player(&store, p.id).await, p);
        }
    }

    #[tokio::test]
    async fn duplicate_player_is_rejected() {
        let (state, store, players) = setup().await;
        let mut player_ids = ids(&players);
        player_ids[2] = player_ids[0];

        let err = create_game(&state, request(player_ids, SCENARIO))
            .await
            .unwrap_err();
        let ServiceError::Validation(rejection) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(rejection.duplicate_players(), Some([players[0].id].as_slice()));
        assert_eq!(rejection.score_sum(), None);
        assert!(store.list_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn both_rules_are_reported_together() {
        let (state, _store, players) = setup().await;
        let mut player_ids = ids(&players);
        player_ids[1] = player_ids[3];
        let mut rows = SCENARIO;
        rows[0].1 = 39_000;

        let err = create_game(&state, request(player_ids, rows))
            .await
            .unwrap_err();
        let ServiceError::Validation(rejection) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(rejection.issues().len(), 2);
    }

    #[tokio::test]
    async fn unknown_player_is_not_found_and_writes_nothing() {
        let (state, store, players) = setup().await;
        let mut player_ids = ids(&players);
        player_ids[3] = Uuid::new_v4();

        let err = create_game(&state, request(player_ids, SCENARIO))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(store.list_games().await.unwrap().is_empty());
        assert_eq!(player(&store, players[0].id).await.games_played, 0);
    }

    #[tokio::test]
    async fn wrong_entry_count_is_invalid_input() {
        let (state, _store, players) = setup().await;
        let mut request = request(ids(&players), SCENARIO);
        request.scores.pop();

        let err = create_game(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_bounds_figures_write_nothing() {
        let (state, store, players) = setup().await;
        let rows = [
            (1, i64::MAX, i64::MAX),
            (2, 1, 0),
            (3, i64::MIN + 1, 0),
            (4, 100_000, 0),
        ];

        let err = create_game(&state, request(ids(&players), rows))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(store.list_games().await.unwrap().is_empty());
        for p in &players {
            assert_same_ledger(&player(&store, p.id).await, p);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_get_distinct_numbers_and_full_ledgers() {
        const GAMES: u32 = 8;
        let (state, store, players) = setup().await;

        let tasks: Vec<_> = (0..GAMES)
            .map(|_| {
                let state = state.clone();
                let player_ids = ids(&players);
                tokio::spawn(async move { create_game(&state, request(player_ids, SCENARIO)).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for task in join_all(tasks).await {
            numbers.push(task.unwrap().unwrap().game_no);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=GAMES).collect::<Vec<_>>());

        let games = i64::from(GAMES);
        for (p, (rank, score, points_diff)) in players.iter().zip(SCENARIO) {
            let ledger = player(&store, p.id).await;
            assert_eq!(ledger.games_played, GAMES);
            assert_eq!(ledger.rank_sum, games * i64::from(rank));
            assert_eq!(ledger.sum_game_score, games * score);
            assert_eq!(ledger.total_score, games * points_diff);
        }
        assert!(store.list_reconciliations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_winner_and_played_at_are_kept() {
        let (state, _store, players) = setup().await;
        let mut request = request(ids(&players), SCENARIO);
        request.winner = Some("  Table A  ".into());
        request.played_at = Some("2024-03-09T10:30:00Z".into());

        let game = create_game(&state, request).await.unwrap();
        assert_eq!(game.winner, "Table A");
        assert_eq!(game.played_at, "2024-03-09T10:30:00Z");
    }

    #[tokio::test]
    async fn failed_player_update_records_marker_and_keeps_game() {
        let memory = InMemoryLedgerStore::new();
        let players = seed(&memory).await;
        let store = FlakyLedgerStore::new(memory.clone());
        store.fail_saves_for(players[2].id).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let err = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap_err();
        let ServiceError::PartialUpdate(failure) = err else {
            panic!("expected a partial update, got {err:?}");
        };
        assert_eq!(failure.game_no, 1);
        assert_eq!(failure.operation, StatsOperation::Apply);
        assert!(failure.marker_recorded);
        assert_eq!(failure.failed.len(), 1);
        assert_eq!(failure.failed[0].player_id, players[2].id);

        assert_eq!(memory.list_games().await.unwrap().len(), 1);
        let markers = memory.list_reconciliations().await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].game_id, failure.game_id);
        assert_eq!(player(&memory, players[0].id).await.games_played, 1);
        assert_eq!(player(&memory, players[2].id).await.games_played, 0);
    }

    #[tokio::test]
    async fn unrecorded_marker_is_still_reported() {
        let memory = InMemoryLedgerStore::new();
        let players = seed(&memory).await;
        let store = FlakyLedgerStore::new(memory.clone());
        store.fail_saves_for(players[0].id).await;
        store.fail_markers();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let err = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap_err();
        let ServiceError::PartialUpdate(failure) = err else {
            panic!("expected a partial update, got {err:?}");
        };
        assert!(!failure.marker_recorded);
        assert!(memory.list_reconciliations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_game_is_not_found() {
        let (state, _store, _players) = setup().await;
        let err = delete_game(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_skips_players_that_no_longer_exist() {
        let (state, store, players) = setup().await;
        let game = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();
        store.delete_player(players[1].id).await.unwrap();

        delete_game(&state, game.id).await.unwrap();

        assert!(store.list_games().await.unwrap().is_empty());
        assert!(store.list_reconciliations().await.unwrap().is_empty());
        assert_eq!(player(&store, players[0].id).await.games_played, 0);
    }

    #[tokio::test]
    async fn delete_keeps_game_when_no_player_could_be_reverted() {
        let memory = InMemoryLedgerStore::new();
        let players = seed(&memory).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(memory.clone()));
        let game = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();

        let store = FlakyLedgerStore::new(memory.clone());
        for p in &players {
            store.fail_saves_for(p.id).await;
        }
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let err = delete_game(&state, game.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(memory.list_games().await.unwrap().len(), 1);
        assert!(memory.list_reconciliations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn partial_revert_deletes_game_and_records_marker() {
        let memory = InMemoryLedgerStore::new();
        let players = seed(&memory).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(memory.clone()));
        let game = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();

        let store = FlakyLedgerStore::new(memory.clone());
        store.fail_saves_for(players[3].id).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let err = delete_game(&state, game.id).await.unwrap_err();
        let ServiceError::PartialUpdate(failure) = err else {
            panic!("expected a partial update, got {err:?}");
        };
        assert_eq!(failure.operation, StatsOperation::Revert);
        assert_eq!(failure.failed[0].player_id, players[3].id);

        assert!(memory.list_games().await.unwrap().is_empty());
        assert_eq!(memory.list_reconciliations().await.unwrap().len(), 1);
        assert_eq!(player(&memory, players[3].id).await.games_played, 1);
    }

    #[tokio::test]
    async fn queries_return_newest_first() {
        let (state, _store, players) = setup().await;
        let first = create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();
        create_game(&state, request(ids(&players), SCENARIO))
            .await
            .unwrap();

        let games = list_games(&state).await.unwrap();
        assert_eq!(
            games.iter().map(|game| game.game_no).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(get_game(&state, first.id).await.unwrap().game_no, 1);
        assert!(matches!(
            get_game(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn degraded_mode_refuses_writes() {
        let state = AppState::new(AppConfig::default());
        let err = create_game(&state, request([Uuid::new_v4(); 4], SCENARIO))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
