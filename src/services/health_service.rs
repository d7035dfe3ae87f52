use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed store and report whether the service can serve data.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage = state.config().storage.label();

    match state.store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded(storage)
    } else {
        HealthResponse::ok(storage)
    }
}
