//! Swiss tournament error types.

use super::models::{PlayerId, TournamentId};
use thiserror::Error;

/// Swiss tournament errors
#[derive(Debug, Error)]
pub enum SwissError {
    /// No tournament carries this name
    #[error("Tournament {0} does not exist")]
    TournamentNotFound(String),

    /// No tournament carries this id
    #[error("Tournament not found: {0}")]
    TournamentIdNotFound(TournamentId),

    /// Player is not part of the tournament's pool
    #[error("Player {player_id} is not enrolled in tournament {tournament_id}")]
    PlayerNotEnrolled {
        player_id: PlayerId,
        tournament_id: TournamentId,
    },

    /// Player already enrolled in the tournament
    #[error("Player {player} already exists in tournament {tournament}")]
    DuplicateEnrollment { player: String, tournament: String },

    /// The unordered pair already played in this tournament
    #[error("Players {winner_id} and {loser_id} already played in tournament {tournament_id}")]
    DuplicateMatch {
        tournament_id: TournamentId,
        winner_id: PlayerId,
        loser_id: PlayerId,
    },

    /// A player cannot be recorded against itself
    #[error("Player {0} cannot play against itself")]
    SelfMatch(PlayerId),

    /// Pairing requested for too small a pool
    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    /// Odd pool where every player already received a bye
    #[error("Every player in tournament {0} has already received a bye")]
    ByeUnavailable(TournamentId),

    /// Rematch avoidance found no complete pairing
    #[error("No pairing without rematches exists for tournament {0}")]
    NoRematchFreePairing(TournamentId),

    /// Blank player or tournament name
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Persistence layer is unreachable
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for SwissError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => SwissError::Connection(err.to_string()),
            other => SwissError::Database(other),
        }
    }
}

impl SwissError {
    /// Whether the error means the store cannot be used any more.
    ///
    /// Every other variant is a caller-visible, recoverable failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SwissError::Connection(_))
    }

    /// Whether this is one of the "not found" kinds
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SwissError::TournamentNotFound(_)
                | SwissError::TournamentIdNotFound(_)
                | SwissError::PlayerNotEnrolled { .. }
        )
    }

    /// Get a client-safe error message that doesn't leak persistence details
    pub fn client_message(&self) -> String {
        match self {
            SwissError::Database(_) => "Internal server error".to_string(),
            SwissError::Connection(_) => "Service unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for Swiss tournament operations
pub type SwissResult<T> = Result<T, SwissError>;
