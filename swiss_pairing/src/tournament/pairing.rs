//! Next-round pairing with bye handling.
//!
//! Rounds pair neighbours in the standings: first with second, third with
//! fourth and so on. An odd pool first hands one player a bye (an automatic
//! win against [`BYE_PLAYER_ID`](super::models::BYE_PLAYER_ID)) and pairs the
//! rest.
//!
//! Under [`RematchPolicy::Delegate`] the engine never looks at earlier
//! rounds; a repeated pair is only caught when its result is recorded. Under
//! [`RematchPolicy::Avoid`] it searches for the pairing closest to neighbour
//! order in which nobody meets a previous opponent.

use super::errors::{SwissError, SwissResult};
use super::matches::MatchRegistry;
use super::models::{
    ByeAward, ByeSelection, MIN_PAIRING_PLAYERS, Pairing, PairingConfig, PlayerId, RematchPolicy,
    RoundPairings, Standing, TournamentId, pair_key,
};
use super::standings::StandingsCalculator;
use crate::db::TournamentStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Unordered pairs that already met, as produced by [`pair_key`]
pub type PlayedPairs = HashSet<(PlayerId, PlayerId)>;

/// Pair neighbouring rows: 0 with 1, 2 with 3, ...
///
/// A trailing odd row is left unpaired.
pub fn pair_adjacent(rows: &[Standing]) -> Vec<Pairing> {
    rows.chunks_exact(2)
        .map(|pair| Pairing::between(&pair[0], &pair[1]))
        .collect()
}

/// Pair every row without repeating a pair from `played`.
///
/// Depth-first over the rank order: the highest unpaired row takes the
/// nearest lower row it has not met, backtracking when the rest cannot be
/// completed. With no history this yields exactly [`pair_adjacent`].
/// Returns `None` when no complete rematch-free pairing exists.
///
/// Branches are cut as soon as some unpaired row has no unpaired opponent
/// left, and sets of unpaired rows already shown to be unpairable are never
/// searched twice.
pub fn pair_avoiding_rematches(rows: &[Standing], played: &PlayedPairs) -> Option<Vec<Pairing>> {
    if rows.len() % 2 != 0 {
        return None;
    }

    let mut search = RematchFreeSearch::new(rows, played);
    if search.run() {
        Some(
            search
                .chosen
                .into_iter()
                .map(|(a, b)| Pairing::between(&rows[a], &rows[b]))
                .collect(),
        )
    } else {
        None
    }
}

/// Backtracking state for [`pair_avoiding_rematches`]
struct RematchFreeSearch {
    /// Opponents each row has not met yet, in rank order
    open: Vec<Vec<usize>>,
    used: Vec<bool>,
    chosen: Vec<(usize, usize)>,
    dead_ends: HashSet<Vec<bool>>,
}

impl RematchFreeSearch {
    fn new(rows: &[Standing], played: &PlayedPairs) -> Self {
        let open = (0..rows.len())
            .map(|i| {
                (0..rows.len())
                    .filter(|&j| {
                        j != i && !played.contains(&pair_key(rows[i].player_id, rows[j].player_id))
                    })
                    .collect()
            })
            .collect();

        Self {
            open,
            used: vec![false; rows.len()],
            chosen: Vec::with_capacity(rows.len() / 2),
            dead_ends: HashSet::new(),
        }
    }

    fn run(&mut self) -> bool {
        let Some(first) = self.used.iter().position(|u| !u) else {
            return true;
        };
        if self.dead_ends.contains(&self.used) || self.has_stranded_row() {
            return false;
        }

        self.used[first] = true;
        for k in 0..self.open[first].len() {
            let next = self.open[first][k];
            if self.used[next] {
                continue;
            }
            self.used[next] = true;
            self.chosen.push((first, next));
            if self.run() {
                return true;
            }
            self.chosen.pop();
            self.used[next] = false;
        }
        self.used[first] = false;

        self.dead_ends.insert(self.used.clone());
        false
    }

    /// Some unpaired row can no longer meet any unpaired opponent
    fn has_stranded_row(&self) -> bool {
        self.open
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.used[*i])
            .any(|(_, opponents)| opponents.iter().all(|&j| self.used[j]))
    }
}

/// Generates the next round of a tournament
#[derive(Clone)]
pub struct PairingEngine {
    store: Arc<dyn TournamentStore>,
    standings: StandingsCalculator,
    matches: MatchRegistry,
    config: PairingConfig,
}

impl PairingEngine {
    pub fn new(store: Arc<dyn TournamentStore>, config: PairingConfig) -> Self {
        Self {
            standings: StandingsCalculator::new(store.clone()),
            matches: MatchRegistry::new(store.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> PairingConfig {
        self.config
    }

    /// Pairings for the next round
    ///
    /// With an odd pool this records the bye before returning, so the
    /// recipient's automatic win is already in the standings.
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament to pair
    ///
    /// # Returns
    ///
    /// * `SwissResult<RoundPairings>` - Pairs in rank order and the bye, if any
    ///
    /// # Errors
    ///
    /// * `SwissError::TournamentIdNotFound` - Unknown tournament
    /// * `SwissError::InsufficientPlayers` - Fewer than two enrolled players
    /// * `SwissError::ByeUnavailable` - Odd pool and everyone already had a bye
    /// * `SwissError::NoRematchFreePairing` - `RematchPolicy::Avoid` found no
    ///   complete pairing; nothing is written
    pub async fn next_round_pairings(
        &self,
        tournament_id: TournamentId,
    ) -> SwissResult<RoundPairings> {
        let standings = self.standings.standings(tournament_id).await?;
        if standings.len() < MIN_PAIRING_PLAYERS {
            return Err(SwissError::InsufficientPlayers {
                needed: MIN_PAIRING_PLAYERS,
                current: standings.len(),
            });
        }

        let played = match self.config.rematch_policy {
            RematchPolicy::Delegate => PlayedPairs::new(),
            RematchPolicy::Avoid => self
                .store
                .matches(tournament_id)
                .await?
                .iter()
                .map(|m| pair_key(m.winner_id, m.loser_id))
                .collect(),
        };

        if standings.len() % 2 == 0 {
            let pairings = self.pair(tournament_id, &standings, &played)?;
            log::info!(
                "Paired {} matches for tournament {}",
                pairings.len(),
                tournament_id
            );
            return Ok(RoundPairings {
                pairings,
                bye: None,
            });
        }

        let candidate = self
            .select_bye(tournament_id, &standings, &played)
            .await?;
        let record = self
            .matches
            .give_bye(candidate.player_id, tournament_id)
            .await?;

        let remaining: Vec<Standing> = self
            .standings
            .standings(tournament_id)
            .await?
            .into_iter()
            .filter(|s| s.player_id != candidate.player_id)
            .collect();
        let pairings = self.pair(tournament_id, &remaining, &played)?;
        log::info!(
            "Paired {} matches for tournament {}, bye to {}",
            pairings.len(),
            tournament_id,
            candidate.player_id
        );

        Ok(RoundPairings {
            pairings,
            bye: Some(ByeAward {
                player_id: candidate.player_id,
                name: candidate.name.clone(),
                match_id: record.id,
            }),
        })
    }

    fn pair(
        &self,
        tournament_id: TournamentId,
        rows: &[Standing],
        played: &PlayedPairs,
    ) -> SwissResult<Vec<Pairing>> {
        match self.config.rematch_policy {
            RematchPolicy::Delegate => Ok(pair_adjacent(rows)),
            RematchPolicy::Avoid => pair_avoiding_rematches(rows, played)
                .ok_or(SwissError::NoRematchFreePairing(tournament_id)),
        }
    }

    /// Choose the bye recipient among players without a previous bye
    async fn select_bye<'a>(
        &self,
        tournament_id: TournamentId,
        standings: &'a [Standing],
        played: &PlayedPairs,
    ) -> SwissResult<&'a Standing> {
        let eligible: HashSet<PlayerId> = self
            .store
            .players_without_bye(tournament_id)
            .await?
            .into_iter()
            .collect();

        let mut candidates: Vec<&Standing> = standings
            .iter()
            .filter(|s| eligible.contains(&s.player_id))
            .collect();
        match self.config.bye_selection {
            ByeSelection::LowestRanked => candidates.reverse(),
            ByeSelection::LowestId => candidates.sort_by_key(|s| s.player_id),
        }

        if candidates.is_empty() {
            return Err(SwissError::ByeUnavailable(tournament_id));
        }

        match self.config.rematch_policy {
            RematchPolicy::Delegate => Ok(candidates[0]),
            RematchPolicy::Avoid => candidates
                .into_iter()
                .find(|candidate| {
                    let rest: Vec<Standing> = standings
                        .iter()
                        .filter(|s| s.player_id != candidate.player_id)
                        .cloned()
                        .collect();
                    pair_avoiding_rematches(&rest, played).is_some()
                })
                .ok_or(SwissError::NoRematchFreePairing(tournament_id)),
        }
    }
}
