use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::reconciliation::ReconciliationSummary,
    error::{AppError, ErrorBody},
    services::reconciliation,
    state::SharedState,
};

/// Reconciliation marker endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/reconciliations", get(list_reconciliations))
}

/// List games whose player statistics diverged, oldest first.
#[utoipa::path(
    get,
    path = "/reconciliations",
    tag = "reconciliation",
    responses(
        (status = 200, description = "Outstanding markers", body = [ReconciliationSummary]),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn list_reconciliations(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ReconciliationSummary>>, AppError> {
    let markers = reconciliation::list_reconciliations(&state).await?;
    Ok(Json(markers.into_iter().map(Into::into).collect()))
}
