//! Name-based facade over the registries, standings and pairing engine.

use super::errors::SwissResult;
use super::matches::MatchRegistry;
use super::models::{MatchRecord, PairingConfig, PlayerId, RoundPairings, Standing, Tournament};
use super::pairing::PairingEngine;
use super::registry::TournamentRegistry;
use super::standings::StandingsCalculator;
use crate::db::TournamentStore;
use std::sync::Arc;

/// Tournament manager
///
/// All components share one store; none of them caches anything, so several
/// managers over the same store always agree.
#[derive(Clone)]
pub struct TournamentManager {
    registry: TournamentRegistry,
    matches: MatchRegistry,
    standings: StandingsCalculator,
    pairing: PairingEngine,
}

impl TournamentManager {
    /// Create a manager with the default pairing policy
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self::with_config(store, PairingConfig::default())
    }

    /// Create a manager with an explicit pairing policy
    pub fn with_config(store: Arc<dyn TournamentStore>, config: PairingConfig) -> Self {
        Self {
            registry: TournamentRegistry::new(store.clone()),
            matches: MatchRegistry::new(store.clone()),
            standings: StandingsCalculator::new(store.clone()),
            pairing: PairingEngine::new(store, config),
        }
    }

    pub fn registry(&self) -> &TournamentRegistry {
        &self.registry
    }

    pub fn matches(&self) -> &MatchRegistry {
        &self.matches
    }

    pub fn standings(&self) -> &StandingsCalculator {
        &self.standings
    }

    pub fn pairing(&self) -> &PairingEngine {
        &self.pairing
    }

    /// Enroll a player by name, creating player and tournament as needed
    pub async fn register_player(&self, name: &str, tournament: &str) -> SwissResult<PlayerId> {
        self.registry.enroll(name, tournament).await
    }

    /// Number of players enrolled in the named tournament
    pub async fn count_players(&self, tournament: &str) -> SwissResult<usize> {
        self.registry.count(tournament).await
    }

    /// Record a result in the named tournament
    pub async fn report_match(
        &self,
        winner_id: PlayerId,
        loser_id: PlayerId,
        tournament: &str,
    ) -> SwissResult<MatchRecord> {
        let tournament = self.registry.find_tournament(tournament).await?;
        self.matches
            .record_match(winner_id, loser_id, tournament.id)
            .await
    }

    /// Standings of the named tournament
    pub async fn player_standings(&self, tournament: &str) -> SwissResult<Vec<Standing>> {
        let tournament = self.registry.find_tournament(tournament).await?;
        self.standings.standings(tournament.id).await
    }

    /// Next-round pairings of the named tournament
    pub async fn swiss_pairings(&self, tournament: &str) -> SwissResult<RoundPairings> {
        let tournament = self.registry.find_tournament(tournament).await?;
        self.pairing.next_round_pairings(tournament.id).await
    }

    /// Remove the named tournament's matches
    pub async fn delete_matches(&self, tournament: &str) -> SwissResult<u64> {
        let tournament: Tournament = self.registry.find_tournament(tournament).await?;
        self.matches.clear_matches(tournament.id).await
    }

    /// Remove the named tournament's enrollments
    pub async fn delete_players(&self, tournament: &str) -> SwissResult<u64> {
        self.registry.clear_players(tournament).await
    }
}
