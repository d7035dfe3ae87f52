use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Mahjong ledger backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::players::list_players,
        crate::routes::players::create_player,
        crate::routes::players::get_player,
        crate::routes::players::delete_player,
        crate::routes::players::player_history,
        crate::routes::games::list_games,
        crate::routes::games::create_game,
        crate::routes::games::get_game,
        crate::routes::games::delete_game,
        crate::routes::reconciliation::list_reconciliations,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::CreatePlayerRequest,
            crate::dto::player::PlayerSummary,
            crate::dto::player::PlayerHistoryResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::ScoreInput,
            crate::dto::game::GameSummary,
            crate::dto::game::ScoreSummary,
            crate::dto::reconciliation::ReconciliationSummary,
            crate::dto::reconciliation::FailedPlayerUpdateSummary,
            crate::dao::models::Seat,
            crate::dao::models::StatsOperation,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Player registration and statistics"),
        (name = "games", description = "Game results and their effect on player statistics"),
        (name = "reconciliation", description = "Games whose player statistics diverged"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for expected in [
            "/healthcheck",
            "/players",
            "/players/{id}",
            "/players/{id}/games",
            "/games",
            "/games/{id}",
            "/reconciliations",
        ] {
            assert!(paths.iter().any(|path| path == expected), "missing {expected}");
        }
    }
}
