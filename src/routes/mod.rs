use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod games;
pub mod health;
pub mod players;
pub mod reconciliation;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(players::router())
        .merge(games::router())
        .merge(reconciliation::router());

    api_router.merge(docs::router()).with_state(state)
}
