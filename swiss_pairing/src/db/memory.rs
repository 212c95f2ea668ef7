//! In-memory `TournamentStore`.
//!
//! Every operation runs under one `RwLock`, so the duplicate-pair check and
//! the append in `insert_match` form a single atomic step.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio::sync::RwLock;

use super::repository::TournamentStore;
use crate::tournament::{
    MatchId, MatchRecord, Player, PlayerId, SwissResult, Tournament, TournamentId,
    models::{BYE_PLAYER_ID, pair_key},
};

#[derive(Default)]
struct State {
    tournaments: BTreeMap<TournamentId, Tournament>,
    players: BTreeMap<PlayerId, Player>,
    enrollments: BTreeSet<(TournamentId, PlayerId)>,
    matches: Vec<MatchRecord>,
    pairs: HashSet<(TournamentId, (PlayerId, PlayerId))>,
    next_tournament_id: TournamentId,
    next_player_id: PlayerId,
    next_match_id: MatchId,
}

impl State {
    fn rebuild_pairs(&mut self) {
        self.pairs = self
            .matches
            .iter()
            .map(|m| (m.tournament_id, pair_key(m.winner_id, m.loser_id)))
            .collect();
    }
}

/// Store keeping every row in process memory
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for InMemoryStore {
    async fn ensure_tournament(&self, name: &str) -> SwissResult<Tournament> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.tournaments.values().find(|t| t.name == name) {
            return Ok(existing.clone());
        }

        state.next_tournament_id += 1;
        let tournament = Tournament {
            id: state.next_tournament_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn find_tournament(&self, name: &str) -> SwissResult<Option<Tournament>> {
        let state = self.state.read().await;
        Ok(state.tournaments.values().find(|t| t.name == name).cloned())
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> SwissResult<Option<Tournament>> {
        Ok(self.state.read().await.tournaments.get(&tournament_id).cloned())
    }

    async fn find_player_by_name(&self, name: &str) -> SwissResult<Option<Player>> {
        let state = self.state.read().await;
        Ok(state.players.values().find(|p| p.name == name).cloned())
    }

    async fn insert_player(&self, name: &str) -> SwissResult<Player> {
        let mut state = self.state.write().await;
        state.next_player_id += 1;
        let player = Player {
            id: state.next_player_id,
            name: name.to_string(),
        };
        state.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn insert_enrollment(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.enrollments.insert((tournament_id, player_id)))
    }

    async fn count_enrollments(&self, tournament_id: TournamentId) -> SwissResult<usize> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .count())
    }

    async fn enrolled_players(&self, tournament_id: TournamentId) -> SwissResult<Vec<Player>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .filter_map(|(_, player_id)| state.players.get(player_id).cloned())
            .collect())
    }

    async fn insert_match(
        &self,
        winner_id: PlayerId,
        loser_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<Option<MatchRecord>> {
        let mut state = self.state.write().await;
        if !state
            .pairs
            .insert((tournament_id, pair_key(winner_id, loser_id)))
        {
            return Ok(None);
        }

        state.next_match_id += 1;
        let record = MatchRecord {
            id: state.next_match_id,
            tournament_id,
            winner_id,
            loser_id,
            recorded_at: Utc::now(),
        };
        state.matches.push(record.clone());
        Ok(Some(record))
    }

    async fn matches(&self, tournament_id: TournamentId) -> SwissResult<Vec<MatchRecord>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .iter()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn players_without_bye(
        &self,
        tournament_id: TournamentId,
    ) -> SwissResult<Vec<PlayerId>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .map(|(_, player_id)| *player_id)
            .filter(|player_id| {
                !state
                    .pairs
                    .contains(&(tournament_id, pair_key(*player_id, BYE_PLAYER_ID)))
            })
            .collect())
    }

    async fn delete_matches(&self, tournament_id: TournamentId) -> SwissResult<u64> {
        let mut state = self.state.write().await;
        let before = state.matches.len();
        state.matches.retain(|m| m.tournament_id != tournament_id);
        let removed = before - state.matches.len();
        state.rebuild_pairs();
        Ok(removed as u64)
    }

    async fn delete_all_matches(&self) -> SwissResult<u64> {
        let mut state = self.state.write().await;
        let removed = state.matches.len();
        state.matches.clear();
        state.pairs.clear();
        Ok(removed as u64)
    }

    async fn delete_enrollments(&self, tournament_id: TournamentId) -> SwissResult<u64> {
        let mut state = self.state.write().await;
        let before = state.enrollments.len();
        state.enrollments.retain(|(tid, _)| *tid != tournament_id);
        Ok((before - state.enrollments.len()) as u64)
    }

    async fn delete_all_players(&self) -> SwissResult<u64> {
        let mut state = self.state.write().await;
        let removed = state.players.len();
        state.enrollments.clear();
        state.matches.clear();
        state.pairs.clear();
        state.players.clear();
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_tournament_is_get_or_create() {
        let store = InMemoryStore::new();

        let first = store.ensure_tournament("Spring Open").await.unwrap();
        let second = store.ensure_tournament("Spring Open").await.unwrap();
        let other = store.ensure_tournament("Autumn Cup").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first.id, other.id);
        assert_eq!(
            store.find_tournament("Autumn Cup").await.unwrap(),
            Some(other)
        );
        assert!(store.find_tournament("Winter").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_player_ids_start_above_bye_sentinel() {
        let store = InMemoryStore::new();
        let player = store.insert_player("Ada").await.unwrap();
        assert!(player.id > BYE_PLAYER_ID);
    }

    #[tokio::test]
    async fn test_find_player_prefers_lowest_id() {
        let store = InMemoryStore::new();
        let first = store.insert_player("Sam").await.unwrap();
        store.insert_player("Sam").await.unwrap();

        let found = store.find_player_by_name("Sam").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_enrollment_is_unique_per_tournament() {
        let store = InMemoryStore::new();
        let t1 = store.ensure_tournament("One").await.unwrap();
        let t2 = store.ensure_tournament("Two").await.unwrap();
        let p = store.insert_player("Ada").await.unwrap();

        assert!(store.insert_enrollment(p.id, t1.id).await.unwrap());
        assert!(!store.insert_enrollment(p.id, t1.id).await.unwrap());
        assert!(store.insert_enrollment(p.id, t2.id).await.unwrap());

        assert_eq!(store.count_enrollments(t1.id).await.unwrap(), 1);
        assert_eq!(store.count_enrollments(t2.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_match_rejects_swapped_pair() {
        let store = InMemoryStore::new();
        let t = store.ensure_tournament("One").await.unwrap();

        assert!(store.insert_match(1, 2, t.id).await.unwrap().is_some());
        assert!(store.insert_match(1, 2, t.id).await.unwrap().is_none());
        assert!(store.insert_match(2, 1, t.id).await.unwrap().is_none());
        assert_eq!(store.matches(t.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_pair_allowed_in_other_tournament() {
        let store = InMemoryStore::new();
        let t1 = store.ensure_tournament("One").await.unwrap();
        let t2 = store.ensure_tournament("Two").await.unwrap();

        assert!(store.insert_match(1, 2, t1.id).await.unwrap().is_some());
        assert!(store.insert_match(2, 1, t2.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_identical_inserts_only_one_wins() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let tid = store.ensure_tournament("One").await.unwrap().id;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let (w, l) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                    store.insert_match(w, l, tid).await.unwrap().is_some()
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_players_without_bye() {
        let store = InMemoryStore::new();
        let t = store.ensure_tournament("One").await.unwrap();
        for name in ["A", "B", "C"] {
            let p = store.insert_player(name).await.unwrap();
            store.insert_enrollment(p.id, t.id).await.unwrap();
        }

        store.insert_match(2, BYE_PLAYER_ID, t.id).await.unwrap();
        assert_eq!(store.players_without_bye(t.id).await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_delete_matches_frees_pairs_of_that_tournament_only() {
        let store = InMemoryStore::new();
        let t1 = store.ensure_tournament("One").await.unwrap();
        let t2 = store.ensure_tournament("Two").await.unwrap();
        store.insert_match(1, 2, t1.id).await.unwrap();
        store.insert_match(1, 2, t2.id).await.unwrap();

        assert_eq!(store.delete_matches(t1.id).await.unwrap(), 1);
        assert!(store.insert_match(1, 2, t1.id).await.unwrap().is_some());
        assert!(store.insert_match(1, 2, t2.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all_players_clears_pool() {
        let store = InMemoryStore::new();
        let t = store.ensure_tournament("One").await.unwrap();
        let p = store.insert_player("Ada").await.unwrap();
        store.insert_enrollment(p.id, t.id).await.unwrap();

        assert_eq!(store.delete_all_players().await.unwrap(), 1);
        assert_eq!(store.count_enrollments(t.id).await.unwrap(), 0);
        assert!(store.find_player_by_name("Ada").await.unwrap().is_none());
        // Tournaments survive a player wipe
        assert!(store.find_tournament("One").await.unwrap().is_some());
    }
}
