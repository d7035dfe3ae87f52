mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoLedgerStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        if err.is_duplicate_key() {
            return StorageError::conflict(err.to_string());
        }
        if matches!(err, MongoDaoError::MalformedDocument { .. }) {
            return StorageError::Corrupt {
                message: err.to_string(),
            };
        }
        StorageError::unavailable(err.to_string(), err)
    }
}
