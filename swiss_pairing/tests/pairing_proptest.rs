//! Property-based tests for the standings fold and the pairing functions
//!
//! These tests check ordering and partition guarantees over randomly
//! generated pools and match logs.

use chrono::Utc;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use swiss_pairing::db::InMemoryStore;
use swiss_pairing::tournament::{
    MatchRecord, PairingConfig, Player, PlayedPairs, PlayerId, RematchPolicy, Standing,
    TournamentManager, fold_standings, models::pair_key, pair_adjacent, pair_avoiding_rematches,
};

fn players(n: usize) -> Vec<Player> {
    (1..=n as PlayerId)
        .map(|id| Player {
            id,
            name: format!("Player {id}"),
        })
        .collect()
}

// Strategy to generate a pool size and a rematch-free match log over it
fn pool_and_log_strategy() -> impl Strategy<Value = (usize, Vec<(PlayerId, PlayerId)>)> {
    (2usize..=16).prop_flat_map(|n| {
        let pair = (1..=n as PlayerId, 1..=n as PlayerId)
            .prop_filter("No self matches", |(a, b)| a != b);
        (Just(n), prop::collection::vec(pair, 0..40)).prop_map(|(n, raw)| {
            let mut seen = BTreeSet::new();
            let log: Vec<(PlayerId, PlayerId)> = raw
                .into_iter()
                .filter(|&(w, l)| seen.insert(pair_key(w, l)))
                .collect();
            (n, log)
        })
    })
}

fn to_records(log: &[(PlayerId, PlayerId)]) -> Vec<MatchRecord> {
    log.iter()
        .enumerate()
        .map(|(i, &(winner_id, loser_id))| MatchRecord {
            id: i as i64 + 1,
            tournament_id: 1,
            winner_id,
            loser_id,
            recorded_at: Utc::now(),
        })
        .collect()
}

fn assert_partition(pairings_ids: &[PlayerId], rows: &[Standing]) -> Result<(), TestCaseError> {
    let paired: BTreeSet<PlayerId> = pairings_ids.iter().copied().collect();
    let expected: BTreeSet<PlayerId> = rows.iter().map(|s| s.player_id).collect();
    prop_assert_eq!(paired.len(), pairings_ids.len(), "A player was paired twice");
    prop_assert_eq!(paired, expected);
    Ok(())
}

proptest! {
    #[test]
    fn test_fold_lists_every_player_once((n, log) in pool_and_log_strategy()) {
        let standings = fold_standings(&players(n), &to_records(&log));

        prop_assert_eq!(standings.len(), n);
        let ids: HashSet<_> = standings.iter().map(|s| s.player_id).collect();
        prop_assert_eq!(ids.len(), n);
    }

    #[test]
    fn test_fold_counts_add_up((n, log) in pool_and_log_strategy()) {
        let standings = fold_standings(&players(n), &to_records(&log));

        for row in &standings {
            prop_assert_eq!(row.matches, row.wins + row.losses);
        }
        let total_wins: u32 = standings.iter().map(|s| s.wins).sum();
        let total_matches: u32 = standings.iter().map(|s| s.matches).sum();
        prop_assert_eq!(total_wins as usize, log.len());
        prop_assert_eq!(total_matches as usize, log.len() * 2);
    }

    #[test]
    fn test_fold_orders_by_wins_then_id((n, log) in pool_and_log_strategy()) {
        let standings = fold_standings(&players(n), &to_records(&log));

        for window in standings.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            prop_assert!(
                a.wins > b.wins || (a.wins == b.wins && a.player_id < b.player_id),
                "{:?} ranked above {:?}", a, b
            );
        }
    }

    #[test]
    fn test_adjacent_pairing_partitions_even_pools((n, log) in pool_and_log_strategy()) {
        let mut standings = fold_standings(&players(n), &to_records(&log));
        standings.truncate(n - n % 2);

        let pairings = pair_adjacent(&standings);
        prop_assert_eq!(pairings.len(), standings.len() / 2);
        let ids: Vec<_> = pairings.iter().flat_map(|p| [p.player1_id, p.player2_id]).collect();
        assert_partition(&ids, &standings)?;
    }

    #[test]
    fn test_rematch_free_pairing_is_sound((n, log) in pool_and_log_strategy()) {
        let mut standings = fold_standings(&players(n), &to_records(&log));
        standings.truncate(n - n % 2);
        let played: PlayedPairs = log.iter().map(|&(w, l)| pair_key(w, l)).collect();

        if let Some(pairings) = pair_avoiding_rematches(&standings, &played) {
            prop_assert_eq!(pairings.len(), standings.len() / 2);
            for p in &pairings {
                prop_assert!(!played.contains(&pair_key(p.player1_id, p.player2_id)));
            }
            let ids: Vec<_> = pairings.iter().flat_map(|p| [p.player1_id, p.player2_id]).collect();
            assert_partition(&ids, &standings)?;
        }
    }

    #[test]
    fn test_first_round_partitions_any_pool(n in 2usize..=15, avoid in any::<bool>()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let config = PairingConfig {
                rematch_policy: if avoid { RematchPolicy::Avoid } else { RematchPolicy::Delegate },
                ..PairingConfig::default()
            };
            let manager = TournamentManager::with_config(Arc::new(InMemoryStore::new()), config);
            let mut ids = Vec::new();
            for i in 0..n {
                ids.push(manager.register_player(&format!("P{i}"), "Prop").await.unwrap());
            }

            let round = manager.swiss_pairings("Prop").await.unwrap();
            prop_assert_eq!(round.pairings.len(), n / 2);
            prop_assert_eq!(round.bye.is_some(), n % 2 == 1);

            let mut covered = round.paired_ids();
            covered.extend(round.bye.iter().map(|b| b.player_id));
            covered.sort_unstable();
            prop_assert_eq!(covered, ids);
            Ok(())
        })?;
    }
}
