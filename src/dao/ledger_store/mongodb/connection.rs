use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_BACKOFF: Duration = Duration::from_millis(250);
const MAX_PING_BACKOFF: Duration = Duration::from_secs(5);

/// Open the ledger database and wait until the server answers a ping.
///
/// The returned handle owns its client, so dropping it releases the pool.
pub async fn open_ledger_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let ledger = client.database(&config.database_name);

    let mut backoff = FIRST_PING_BACKOFF;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match ledger.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = %config.database_name, attempt, "ledger database reachable");
                return Ok(ledger);
            }
            Err(source) if attempt >= PING_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    database: config.database_name.clone(),
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                debug!(
                    database = %config.database_name,
                    attempt,
                    retry_in = ?backoff,
                    error = %err,
                    "ledger database not answering yet"
                );
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_PING_BACKOFF);
            }
        }
    }
}
