//! Append-only match log with duplicate-pair rejection.

use super::errors::{SwissError, SwissResult};
use super::models::{BYE_PLAYER_ID, MatchRecord, PlayerId, TournamentId};
use crate::db::TournamentStore;
use std::sync::Arc;

/// Records match outcomes for tournaments
#[derive(Clone)]
pub struct MatchRegistry {
    store: Arc<dyn TournamentStore>,
}

impl MatchRegistry {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    /// Record the outcome of a single match
    ///
    /// The duplicate check ignores who won: once two players met in a
    /// tournament, neither `(winner, loser)` nor `(loser, winner)` can be
    /// recorded again there. Retrying a successful call therefore yields
    /// `DuplicateMatch` instead of a second record.
    ///
    /// # Arguments
    ///
    /// * `winner_id` - Winning player
    /// * `loser_id` - Losing player, or [`BYE_PLAYER_ID`] for a bye
    /// * `tournament_id` - Tournament the match belongs to
    ///
    /// # Returns
    ///
    /// * `SwissResult<MatchRecord>` - The stored match
    ///
    /// # Errors
    ///
    /// * `SwissError::TournamentIdNotFound` - Unknown tournament
    /// * `SwissError::SelfMatch` - Winner and loser are the same player
    /// * `SwissError::PlayerNotEnrolled` - A player is outside the tournament's pool
    /// * `SwissError::DuplicateMatch` - The pair already played; nothing is written
    pub async fn record_match(
        &self,
        winner_id: PlayerId,
        loser_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<MatchRecord> {
        if winner_id == loser_id {
            return Err(SwissError::SelfMatch(winner_id));
        }
        if self.store.get_tournament(tournament_id).await?.is_none() {
            return Err(SwissError::TournamentIdNotFound(tournament_id));
        }

        let enrolled = self.store.enrolled_players(tournament_id).await?;
        let is_enrolled = |id: PlayerId| enrolled.iter().any(|p| p.id == id);
        // The sentinel may only ever lose
        let unknown = if !is_enrolled(winner_id) {
            Some(winner_id)
        } else if loser_id != BYE_PLAYER_ID && !is_enrolled(loser_id) {
            Some(loser_id)
        } else {
            None
        };
        if let Some(player_id) = unknown {
            return Err(SwissError::PlayerNotEnrolled {
                player_id,
                tournament_id,
            });
        }

        match self
            .store
            .insert_match(winner_id, loser_id, tournament_id)
            .await?
        {
            Some(record) => {
                log::debug!(
                    "Recorded match {} in tournament {}: {} beat {}",
                    record.id,
                    tournament_id,
                    winner_id,
                    loser_id
                );
                Ok(record)
            }
            None => {
                log::warn!(
                    "Rejected rematch of {} and {} in tournament {}",
                    winner_id,
                    loser_id,
                    tournament_id
                );
                Err(SwissError::DuplicateMatch {
                    tournament_id,
                    winner_id,
                    loser_id,
                })
            }
        }
    }

    /// Give the player a bye: an automatic win against the bye sentinel
    ///
    /// A player can receive at most one bye per tournament; a second one is
    /// rejected as `DuplicateMatch` like any other repeated pair.
    pub async fn give_bye(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<MatchRecord> {
        let record = self
            .record_match(player_id, BYE_PLAYER_ID, tournament_id)
            .await?;
        log::info!(
            "Player {} receives a bye in tournament {}",
            player_id,
            tournament_id
        );
        Ok(record)
    }

    /// Match log of a tournament in recording order
    pub async fn matches(&self, tournament_id: TournamentId) -> SwissResult<Vec<MatchRecord>> {
        self.store.matches(tournament_id).await
    }

    /// Remove every match of one tournament
    pub async fn clear_matches(&self, tournament_id: TournamentId) -> SwissResult<u64> {
        if self.store.get_tournament(tournament_id).await?.is_none() {
            return Err(SwissError::TournamentIdNotFound(tournament_id));
        }
        let removed = self.store.delete_matches(tournament_id).await?;
        log::info!("Removed {} matches from tournament {}", removed, tournament_id);
        Ok(removed)
    }

    /// Remove every match of every tournament
    pub async fn clear_all_matches(&self) -> SwissResult<u64> {
        let removed = self.store.delete_all_matches().await?;
        log::info!("Removed all {} matches", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::tournament::TournamentRegistry;

    async fn setup(names: &[&str]) -> (MatchRegistry, TournamentId, Vec<PlayerId>) {
        let store: Arc<dyn TournamentStore> = Arc::new(InMemoryStore::new());
        let registry = TournamentRegistry::new(store.clone());
        let mut ids = Vec::new();
        for name in names {
            ids.push(registry.enroll(name, "Spring Open").await.unwrap());
        }
        let tid = registry.find_tournament("Spring Open").await.unwrap().id;
        (MatchRegistry::new(store), tid, ids)
    }

    #[tokio::test]
    async fn test_record_then_duplicate_either_order() {
        let (matches, tid, ids) = setup(&["Bruno", "Boots"]).await;

        let record = matches.record_match(ids[0], ids[1], tid).await.unwrap();
        assert_eq!(record.winner_id, ids[0]);

        let again = matches.record_match(ids[0], ids[1], tid).await.unwrap_err();
        assert!(matches!(again, SwissError::DuplicateMatch { .. }));
        let swapped = matches.record_match(ids[1], ids[0], tid).await.unwrap_err();
        assert!(matches!(swapped, SwissError::DuplicateMatch { .. }));

        assert_eq!(matches.matches(tid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_self_match_rejected() {
        let (matches, tid, ids) = setup(&["Solo"]).await;
        assert!(matches!(
            matches.record_match(ids[0], ids[0], tid).await,
            Err(SwissError::SelfMatch(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_tournament_and_player() {
        let (matches, tid, ids) = setup(&["Ada", "Bob"]).await;

        assert!(matches!(
            matches.record_match(ids[0], ids[1], tid + 100).await,
            Err(SwissError::TournamentIdNotFound(_))
        ));
        assert!(matches!(
            matches.record_match(ids[0], 999, tid).await,
            Err(SwissError::PlayerNotEnrolled { player_id: 999, .. })
        ));
        assert!(matches!(
            matches.record_match(BYE_PLAYER_ID, ids[0], tid).await,
            Err(SwissError::PlayerNotEnrolled { player_id: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_second_bye_for_same_player_rejected() {
        let (matches, tid, ids) = setup(&["Ada", "Bob", "Cy"]).await;

        let bye = matches.give_bye(ids[1], tid).await.unwrap();
        assert!(bye.is_bye());
        assert!(matches!(
            matches.give_bye(ids[1], tid).await,
            Err(SwissError::DuplicateMatch { .. })
        ));
        matches.give_bye(ids[2], tid).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_matches_allows_pair_again() {
        let (matches, tid, ids) = setup(&["Ada", "Bob"]).await;
        matches.record_match(ids[0], ids[1], tid).await.unwrap();

        assert_eq!(matches.clear_matches(tid).await.unwrap(), 1);
        matches.record_match(ids[1], ids[0], tid).await.unwrap();

        assert_eq!(matches.clear_all_matches().await.unwrap(), 1);
        assert!(matches.matches(tid).await.unwrap().is_empty());
        assert!(matches.clear_matches(tid + 1).await.unwrap_err().is_not_found());
    }
}
