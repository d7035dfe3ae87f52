/// OpenAPI documentation generation.
pub mod documentation;
/// Sequential game number assignment with conflict retry.
pub mod game_numbering;
/// Game creation, deletion and queries.
pub mod game_service;
/// Duplicate-player and score-sum rules for submitted games.
pub mod game_validator;
/// Health check service.
pub mod health_service;
/// Player registration, lookup and history.
pub mod player_service;
/// Player statistics ledger and the per-game fan-out.
pub mod player_stats;
/// Durable markers for games whose player statistics diverged.
pub mod reconciliation;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
