/// Persistence of games, players, and reconciliation markers.
pub mod ledger_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
