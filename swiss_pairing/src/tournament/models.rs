//! Swiss tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::ConfigError;

/// Tournament ID type
pub type TournamentId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Match ID type
pub type MatchId = i64;

/// Reserved loser identity of every bye match.
///
/// Stores hand out player ids starting at 1, so this id is never enrolled.
pub const BYE_PLAYER_ID: PlayerId = 0;

/// Tournament used when the caller does not name one
pub const DEFAULT_TOURNAMENT: &str = "MAIN_TOURNAMENT";

/// Players needed before a round can be paired
pub const MIN_PAIRING_PLAYERS: usize = 2;

/// A named tournament namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// One recorded match outcome. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
    pub recorded_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Whether this match is an automatic win against the bye sentinel
    pub fn is_bye(&self) -> bool {
        self.loser_id == BYE_PLAYER_ID
    }

    /// Whether the match involves both players, in either role
    pub fn involves_pair(&self, a: PlayerId, b: PlayerId) -> bool {
        pair_key(self.winner_id, self.loser_id) == pair_key(a, b)
    }
}

/// Order-independent key for a pair of players.
pub fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Derived ranking row for one enrolled player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    /// Always `wins + losses`
    pub matches: u32,
}

/// One pairing of the next round. The higher-ranked player comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub player1_id: PlayerId,
    pub player1_name: String,
    pub player2_id: PlayerId,
    pub player2_name: String,
}

impl Pairing {
    pub(crate) fn between(first: &Standing, second: &Standing) -> Self {
        Self {
            player1_id: first.player_id,
            player1_name: first.name.clone(),
            player2_id: second.player_id,
            player2_name: second.name.clone(),
        }
    }

    /// Whether the player sits in this pairing
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.player1_id == player_id || self.player2_id == player_id
    }
}

/// Player credited with a bye for the round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByeAward {
    pub player_id: PlayerId,
    pub name: String,
    pub match_id: MatchId,
}

/// Next-round output: the ordered pairings plus the bye recipient, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPairings {
    pub pairings: Vec<Pairing>,
    pub bye: Option<ByeAward>,
}

impl RoundPairings {
    /// Every player id that is paired this round
    pub fn paired_ids(&self) -> Vec<PlayerId> {
        self.pairings
            .iter()
            .flat_map(|p| [p.player1_id, p.player2_id])
            .collect()
    }
}

/// How the engine treats pairs that already met
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RematchPolicy {
    /// Pair adjacent ranks blindly; a rematch surfaces as `DuplicateMatch`
    /// when its result is recorded.
    #[default]
    Delegate,
    /// Search for a pairing in which nobody meets a previous opponent
    Avoid,
}

/// Which eligible player receives the bye in an odd round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByeSelection {
    /// Lowest-ranked eligible player in current standings
    #[default]
    LowestRanked,
    /// Eligible player with the smallest id
    LowestId,
}

impl FromStr for RematchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delegate" => Ok(Self::Delegate),
            "avoid" => Ok(Self::Avoid),
            other => Err(format!("unknown rematch policy: {other}")),
        }
    }
}

impl FromStr for ByeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest-ranked" | "lowest_ranked" => Ok(Self::LowestRanked),
            "lowest-id" | "lowest_id" => Ok(Self::LowestId),
            other => Err(format!("unknown bye selection: {other}")),
        }
    }
}

/// Pairing engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingConfig {
    pub rematch_policy: RematchPolicy,
    pub bye_selection: ByeSelection,
}

impl PairingConfig {
    /// Load pairing policy from the environment
    ///
    /// - `SWISS_REMATCH_POLICY`: `delegate` (default) or `avoid`
    /// - `SWISS_BYE_SELECTION`: `lowest-ranked` (default) or `lowest-id`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable value. Unset
    /// variables fall back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`PairingConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            rematch_policy: parse_var(&lookup, "SWISS_REMATCH_POLICY", defaults.rematch_policy)?,
            bye_selection: parse_var(&lookup, "SWISS_BYE_SELECTION", defaults.bye_selection)?,
        })
    }

    /// Configuration that refuses to pair rematches
    pub fn avoiding_rematches() -> Self {
        Self {
            rematch_policy: RematchPolicy::Avoid,
            ..Self::default()
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(winner_id: PlayerId, loser_id: PlayerId) -> MatchRecord {
        MatchRecord {
            id: 1,
            tournament_id: 1,
            winner_id,
            loser_id,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key(3, 7), (3, 7));
        assert_eq!(pair_key(7, 3), (3, 7));
    }

    #[test]
    fn test_match_involves_pair_either_way() {
        let m = record(5, 2);
        assert!(m.involves_pair(5, 2));
        assert!(m.involves_pair(2, 5));
        assert!(!m.involves_pair(5, 3));
    }

    #[test]
    fn test_bye_match_detection() {
        assert!(record(5, BYE_PLAYER_ID).is_bye());
        assert!(!record(5, 2).is_bye());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("avoid".parse::<RematchPolicy>(), Ok(RematchPolicy::Avoid));
        assert_eq!(" Delegate ".parse::<RematchPolicy>(), Ok(RematchPolicy::Delegate));
        assert!("sometimes".parse::<RematchPolicy>().is_err());

        assert_eq!("lowest-id".parse::<ByeSelection>(), Ok(ByeSelection::LowestId));
        assert_eq!(
            "lowest_ranked".parse::<ByeSelection>(),
            Ok(ByeSelection::LowestRanked)
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let config = PairingConfig::from_lookup(|var| match var {
            "SWISS_REMATCH_POLICY" => Some("avoid".to_string()),
            "SWISS_BYE_SELECTION" => Some("lowest-id".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.rematch_policy, RematchPolicy::Avoid);
        assert_eq!(config.bye_selection, ByeSelection::LowestId);

        let defaults = PairingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(defaults, PairingConfig::default());
    }

    #[test]
    fn test_config_rejects_unknown_value() {
        let err = PairingConfig::from_lookup(|var| {
            (var == "SWISS_BYE_SELECTION").then(|| "random".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "SWISS_BYE_SELECTION".to_string(),
                value: "random".to_string(),
            }
        );
    }

    #[test]
    fn test_default_config_is_reference_behavior() {
        let config = PairingConfig::default();
        assert_eq!(config.rematch_policy, RematchPolicy::Delegate);
        assert_eq!(config.bye_selection, ByeSelection::LowestRanked);
        assert_eq!(
            PairingConfig::avoiding_rematches().rematch_policy,
            RematchPolicy::Avoid
        );
    }
}
