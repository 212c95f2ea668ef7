//! Swiss-system tournament core.
//!
//! This module provides:
//! - Tournament resolution by name and player enrollment
//! - An append-only match log that rejects rematches
//! - Standings folded fresh from the match log on every call
//! - Next-round pairing with bye handling for odd pools
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_pairing::db::InMemoryStore;
//! use swiss_pairing::tournament::TournamentManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryStore::new()));
//!
//!     for name in ["Ada", "Grace", "Edsger", "Barbara"] {
//!         manager.register_player(name, "Spring Open").await?;
//!     }
//!
//!     let round = manager.swiss_pairings("Spring Open").await?;
//!     for pairing in &round.pairings {
//!         manager
//!             .report_match(pairing.player1_id, pairing.player2_id, "Spring Open")
//!             .await?;
//!     }
//!
//!     let standings = manager.player_standings("Spring Open").await?;
//!     assert_eq!(standings[0].wins, 1);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod matches;
pub mod models;
pub mod pairing;
pub mod registry;
pub mod standings;

pub use errors::{SwissError, SwissResult};
pub use manager::TournamentManager;
pub use matches::MatchRegistry;
pub use models::{
    BYE_PLAYER_ID, ByeAward, ByeSelection, DEFAULT_TOURNAMENT, MatchId, MatchRecord, Pairing,
    PairingConfig, Player, PlayerId, RematchPolicy, RoundPairings, Standing, Tournament,
    TournamentId,
};
pub use pairing::{PairingEngine, PlayedPairs, pair_adjacent, pair_avoiding_rematches};
pub use registry::TournamentRegistry;
pub use standings::{StandingsCalculator, fold_standings};
