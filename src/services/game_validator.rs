//! Consistency rules a submitted game must satisfy before anything is written.

use std::{collections::HashSet, fmt};

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{SEATS_PER_TABLE, ScoreEntryEntity};

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The same player holds more than one seat; lists each colliding id once.
    DuplicatePlayer { ids: Vec<Uuid> },
    /// The raw scores do not add up to the table total.
    ScoreSum { actual: i128, expected: i64 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::DuplicatePlayer { ids } => {
                let ids = ids
                    .iter()
                    .map(|id| format!("`{id}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "duplicate players detected: {ids}")
            }
            ValidationIssue::ScoreSum { actual, expected } => {
                write!(f, "scores sum to {actual}, expected exactly {expected}")
            }
        }
    }
}

/// Every rule a candidate game broke. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_issues(.issues))]
pub struct GameValidationError {
    issues: Vec<ValidationIssue>,
}

impl GameValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Colliding player ids, when the duplicate rule was broken.
    pub fn duplicate_players(&self) -> Option<&[Uuid]> {
        self.issues.iter().find_map(|issue| match issue {
            ValidationIssue::DuplicatePlayer { ids } => Some(ids.as_slice()),
            _ => None,
        })
    }

    /// Actual score sum, when the score-sum rule was broken.
    pub fn score_sum(&self) -> Option<i128> {
        self.issues.iter().find_map(|issue| match issue {
            ValidationIssue::ScoreSum { actual, .. } => Some(*actual),
            _ => None,
        })
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check the four score entries of a game.
///
/// Both rules are always evaluated so the caller sees every problem at once.
pub fn validate_scores(
    scores: &[ScoreEntryEntity; SEATS_PER_TABLE],
    table_total: i64,
) -> Result<(), GameValidationError> {
    let mut issues = Vec::new();

    let duplicates = duplicate_player_ids(scores);
    if !duplicates.is_empty() {
        issues.push(ValidationIssue::DuplicatePlayer { ids: duplicates });
    }

    // Widened so four extreme scores cannot wrap or saturate into the total.
    let actual: i128 = scores.iter().map(|entry| i128::from(entry.score)).sum();
    if actual != i128::from(table_total) {
        issues.push(ValidationIssue::ScoreSum {
            actual,
            expected: table_total,
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(GameValidationError { issues })
    }
}

fn duplicate_player_ids(scores: &[ScoreEntryEntity]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for entry in scores {
        if !seen.insert(entry.player_id) && !duplicates.contains(&entry.player_id) {
            duplicates.push(entry.player_id);
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Seat;

    const TOTAL: i64 = 100_000;

    fn entry(player_id: Uuid, rank: u8, score: i64, seat: Seat) -> ScoreEntryEntity {
        ScoreEntryEntity {
            player_id,
            rank,
            score,
            seat,
            points_diff: 0,
        }
    }

    fn table(players: [Uuid; 4], scores: [i64; 4]) -> [ScoreEntryEntity; 4] {
        let seats = [Seat::East, Seat::South, Seat::West, Seat::North];
        std::array::from_fn(|i| entry(players[i], i as u8 + 1, scores[i], seats[i]))
    }

    #[test]
    fn accepts_distinct_players_with_exact_total() {
        let players = std::array::from_fn(|_| Uuid::new_v4());
        let scores = table(players, [40_000, 30_000, 20_000, 10_000]);
        assert!(validate_scores(&scores, TOTAL).is_ok());
    }

    #[test]
    fn negative_scores_are_fine_when_the_total_matches() {
        let players = std::array::from_fn(|_| Uuid::new_v4());
        let scores = table(players, [70_000, 25_000, 9_000, -4_000]);
        assert!(validate_scores(&scores, TOTAL).is_ok());
    }

    #[test]
    fn rejects_short_total_with_actual_sum() {
        let players = std::array::from_fn(|_| Uuid::new_v4());
        let scores = table(players, [40_000, 30_000, 20_000, 9_000]);

        let err = validate_scores(&scores, TOTAL).unwrap_err();
        assert_eq!(err.score_sum(), Some(99_000));
        assert_eq!(err.duplicate_players(), None);
        assert_eq!(err.to_string(), "scores sum to 99000, expected exactly 100000");
    }

    #[test]
    fn rejects_duplicate_players_listing_each_once() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let scores = table([a, b, a, a], [25_000; 4]);

        let err = validate_scores(&scores, TOTAL).unwrap_err();
        assert_eq!(err.duplicate_players(), Some([a].as_slice()));
        assert_eq!(err.score_sum(), None);
    }

    #[test]
    fn reports_both_rules_together() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let scores = table([a, b, c, b], [25_000, 25_000, 25_000, 24_000]);

        let err = validate_scores(&scores, TOTAL).unwrap_err();
        assert_eq!(err.issues().len(), 2);
        assert_eq!(err.duplicate_players(), Some([b].as_slice()));
        assert_eq!(err.score_sum(), Some(99_000));
        assert!(err.to_string().contains("; "));
    }

    #[test]
    fn extreme_scores_are_summed_exactly() {
        let players = std::array::from_fn(|_| Uuid::new_v4());
        let scores = table(players, [i64::MAX, 1, i64::MIN + 1, 100_000]);

        let err = validate_scores(&scores, TOTAL).unwrap_err();
        assert_eq!(err.score_sum(), Some(100_001));

        let scores = table(players, [i64::MAX, i64::MAX, 0, 0]);
        let err = validate_scores(&scores, TOTAL).unwrap_err();
        assert_eq!(err.score_sum(), Some(2 * i128::from(i64::MAX)));
    }

    #[test]
    fn honours_configured_table_total() {
        let players = std::array::from_fn(|_| Uuid::new_v4());
        let scores = table(players, [30_000; 4]);

        assert!(validate_scores(&scores, 120_000).is_ok());
        assert!(validate_scores(&scores, TOTAL).is_err());
    }
}
