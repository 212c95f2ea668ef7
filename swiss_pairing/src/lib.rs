//! # Swiss Pairing
//!
//! Swiss-system tournament standings and round pairing.
//!
//! Players enroll into named tournaments, results are appended to a match log
//! that refuses rematches, standings are folded from that log on every call,
//! and each new round pairs neighbouring players in the standings. Odd pools
//! give one player a bye, recorded as an automatic win against a reserved
//! sentinel identity.
//!
//! ## Core Modules
//!
//! - [`tournament`]: registries, standings calculator and pairing engine
//! - [`db`]: the [`db::TournamentStore`] persistence seam with in-memory and
//!   PostgreSQL implementations
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_pairing::{InMemoryStore, TournamentManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), swiss_pairing::SwissError> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryStore::new()));
//!     for name in ["A", "B", "C"] {
//!         manager.register_player(name, "Club Night").await?;
//!     }
//!
//!     // Three players: one bye, one pairing
//!     let round = manager.swiss_pairings("Club Night").await?;
//!     assert!(round.bye.is_some());
//!     assert_eq!(round.pairings.len(), 1);
//!     Ok(())
//! }
//! ```

/// Persistence seam and its implementations.
pub mod db;

/// Swiss tournament core.
pub mod tournament;

pub use db::{Database, DatabaseConfig, InMemoryStore, PgTournamentStore, TournamentStore};
pub use tournament::{
    BYE_PLAYER_ID, PairingConfig, PairingEngine, RematchPolicy, RoundPairings, Standing,
    SwissError, SwissResult, TournamentManager,
};
