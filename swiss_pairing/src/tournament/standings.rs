//! Standings derived from the match log.

use super::errors::{SwissError, SwissResult};
use super::models::{MatchRecord, Player, PlayerId, Standing, TournamentId};
use crate::db::TournamentStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Fold a tournament's match log into ranked standings.
///
/// Every player in `players` gets exactly one row, matches or not. Matches
/// naming anyone outside `players` (including the bye sentinel) only count
/// for the enrolled side. Rows are ordered by wins descending, then player id
/// ascending.
pub fn fold_standings(players: &[Player], matches: &[MatchRecord]) -> Vec<Standing> {
    let mut rows: HashMap<PlayerId, Standing> = players
        .iter()
        .map(|p| {
            (
                p.id,
                Standing {
                    player_id: p.id,
                    name: p.name.clone(),
                    wins: 0,
                    losses: 0,
                    matches: 0,
                },
            )
        })
        .collect();

    for m in matches {
        if let Some(row) = rows.get_mut(&m.winner_id) {
            row.wins += 1;
            row.matches += 1;
        }
        if let Some(row) = rows.get_mut(&m.loser_id) {
            row.losses += 1;
            row.matches += 1;
        }
    }

    let mut standings: Vec<Standing> = rows.into_values().collect();
    standings.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    standings
}

/// Computes standings fresh from the store on every call
#[derive(Clone)]
pub struct StandingsCalculator {
    store: Arc<dyn TournamentStore>,
}

impl StandingsCalculator {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    /// Ranked standings of every enrolled player
    ///
    /// # Returns
    ///
    /// * `SwissResult<Vec<Standing>>` - One row per enrolled player, best first
    ///
    /// # Errors
    ///
    /// * `SwissError::TournamentIdNotFound` - Unknown tournament
    pub async fn standings(&self, tournament_id: TournamentId) -> SwissResult<Vec<Standing>> {
        if self.store.get_tournament(tournament_id).await?.is_none() {
            return Err(SwissError::TournamentIdNotFound(tournament_id));
        }

        let players = self.store.enrolled_players(tournament_id).await?;
        let matches = self.store.matches(tournament_id).await?;
        log::debug!(
            "Folding {} matches over {} players for tournament {}",
            matches.len(),
            players.len(),
            tournament_id
        );
        Ok(fold_standings(&players, &matches))
    }
}
