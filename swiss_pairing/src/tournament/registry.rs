//! Tournament name resolution and player enrollment.

use super::errors::{SwissError, SwissResult};
use super::models::{Player, PlayerId, Tournament, TournamentId};
use crate::db::TournamentStore;
use std::sync::Arc;

/// Resolves tournament names and manages each tournament's player pool
#[derive(Clone)]
pub struct TournamentRegistry {
    store: Arc<dyn TournamentStore>,
}

fn normalize_name(name: &str) -> SwissResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SwissError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

impl TournamentRegistry {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    /// Return the tournament with this name, creating it on first reference
    ///
    /// # Arguments
    ///
    /// * `name` - Tournament name; surrounding whitespace is ignored
    ///
    /// # Returns
    ///
    /// * `SwissResult<Tournament>` - Existing or newly created tournament
    pub async fn ensure_tournament(&self, name: &str) -> SwissResult<Tournament> {
        let name = normalize_name(name)?;
        if let Some(existing) = self.store.find_tournament(name).await? {
            return Ok(existing);
        }

        let tournament = self.store.ensure_tournament(name).await?;
        log::info!("Created tournament {} '{}'", tournament.id, tournament.name);
        Ok(tournament)
    }

    /// Look up a tournament without creating it
    ///
    /// # Errors
    ///
    /// * `SwissError::TournamentNotFound` - No tournament has this name
    pub async fn find_tournament(&self, name: &str) -> SwissResult<Tournament> {
        let name = normalize_name(name)?;
        self.store
            .find_tournament(name)
            .await?
            .ok_or_else(|| SwissError::TournamentNotFound(name.to_string()))
    }

    /// Look up a tournament by id
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> SwissResult<Tournament> {
        self.store
            .get_tournament(tournament_id)
            .await?
            .ok_or(SwissError::TournamentIdNotFound(tournament_id))
    }

    /// Enroll a player in a tournament
    ///
    /// The player is looked up by name and created if unknown; the tournament
    /// likewise. Both may therefore be created as a side effect.
    ///
    /// # Returns
    ///
    /// * `SwissResult<PlayerId>` - Id of the enrolled player
    ///
    /// # Errors
    ///
    /// * `SwissError::DuplicateEnrollment` - Player already in this tournament;
    ///   nothing is written
    /// * `SwissError::InvalidName` - Blank player or tournament name
    pub async fn enroll(&self, player_name: &str, tournament_name: &str) -> SwissResult<PlayerId> {
        let player_name = normalize_name(player_name)?;
        let tournament = self.ensure_tournament(tournament_name).await?;

        let player = match self.store.find_player_by_name(player_name).await? {
            Some(player) => player,
            None => self.store.insert_player(player_name).await?,
        };

        if !self.store.insert_enrollment(player.id, tournament.id).await? {
            log::warn!(
                "Rejected duplicate enrollment of {} in '{}'",
                player.name,
                tournament.name
            );
            return Err(SwissError::DuplicateEnrollment {
                player: player.name,
                tournament: tournament.name,
            });
        }

        log::info!(
            "Enrolled player {} '{}' in tournament '{}'",
            player.id,
            player.name,
            tournament.name
        );
        Ok(player.id)
    }

    /// Number of players enrolled in the named tournament
    ///
    /// # Errors
    ///
    /// * `SwissError::TournamentNotFound` - Tournament does not exist
    pub async fn count(&self, tournament_name: &str) -> SwissResult<usize> {
        let tournament = self.find_tournament(tournament_name).await?;
        self.store.count_enrollments(tournament.id).await
    }

    /// Enrolled players of a tournament, in registration order
    pub async fn enrolled_players(&self, tournament_id: TournamentId) -> SwissResult<Vec<Player>> {
        self.get_tournament(tournament_id).await?;
        self.store.enrolled_players(tournament_id).await
    }

    /// Remove every enrollment of the named tournament
    ///
    /// Players themselves are kept; they may be enrolled elsewhere.
    ///
    /// # Arguments
    ///
    /// * `tournament_name` - Tournament to empty
    ///
    /// # Returns
    ///
    /// * `SwissResult<u64>` - Number of enrollments removed
    pub async fn clear_players(&self, tournament_name: &str) -> SwissResult<u64> {
        let tournament = self.find_tournament(tournament_name).await?;
        let removed = self.store.delete_enrollments(tournament.id).await?;
        log::info!(
            "Removed {} enrollments from tournament '{}'",
            removed,
            tournament.name
        );
        Ok(removed)
    }

    /// Remove every enrollment and every player, in all tournaments
    pub async fn clear_all_players(&self) -> SwissResult<u64> {
        let removed = self.store.delete_all_players().await?;
        log::info!("Removed all {} players", removed);
        Ok(removed)
    }
}
