//! Persistence trait for tournaments, players, enrollments and the match log.
//!
//! The pairing core only ever talks to a [`TournamentStore`]. Implementations
//! must make [`TournamentStore::insert_match`] an atomic check-and-insert over
//! the unordered player pair, so that two concurrent recordings of the same
//! pair cannot both succeed.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::future::Future;
use std::time::Duration;

use super::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::tournament::{
    MatchRecord, Player, PlayerId, SwissError, SwissResult, Tournament, TournamentId,
    models::BYE_PLAYER_ID,
};

/// Trait for tournament persistence operations
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Return the tournament with this name, creating it if needed
    async fn ensure_tournament(&self, name: &str) -> SwissResult<Tournament>;

    /// Find tournament by name
    async fn find_tournament(&self, name: &str) -> SwissResult<Option<Tournament>>;

    /// Find tournament by ID
    async fn get_tournament(&self, tournament_id: TournamentId) -> SwissResult<Option<Tournament>>;

    /// Find the lowest-id player with this name
    async fn find_player_by_name(&self, name: &str) -> SwissResult<Option<Player>>;

    /// Create a new player
    async fn insert_player(&self, name: &str) -> SwissResult<Player>;

    /// Enroll a player. Returns `false` when the enrollment already existed.
    async fn insert_enrollment(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<bool>;

    /// Number of enrollments in a tournament
    async fn count_enrollments(&self, tournament_id: TournamentId) -> SwissResult<usize>;

    /// Enrolled players, ordered by player id
    async fn enrolled_players(&self, tournament_id: TournamentId) -> SwissResult<Vec<Player>>;

    /// Append a match unless the unordered pair already exists in the tournament.
    ///
    /// Returns `None` without writing anything when the pair is present.
    async fn insert_match(
        &self,
        winner_id: PlayerId,
        loser_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<Option<MatchRecord>>;

    /// Match log of a tournament in recording order
    async fn matches(&self, tournament_id: TournamentId) -> SwissResult<Vec<MatchRecord>>;

    /// Enrolled players who never won a bye match, ordered by player id
    async fn players_without_bye(&self, tournament_id: TournamentId)
    -> SwissResult<Vec<PlayerId>>;

    /// Delete a tournament's matches
    async fn delete_matches(&self, tournament_id: TournamentId) -> SwissResult<u64>;

    /// Delete every match
    async fn delete_all_matches(&self) -> SwissResult<u64>;

    /// Delete a tournament's enrollments
    async fn delete_enrollments(&self, tournament_id: TournamentId) -> SwissResult<u64>;

    /// Delete every enrollment and every player
    async fn delete_all_players(&self) -> SwissResult<u64>;
}

/// PostgreSQL implementation of `TournamentStore`
///
/// Expects the schema in `migrations/`. Duplicate pairs are rejected by the
/// `matches_unordered_pair` unique index, not by a read before the write.
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn run<F, T>(&self, future: F) -> SwissResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        Ok(with_timeout(self.query_timeout, future).await?)
    }
}

fn tournament_from_row(row: &PgRow) -> Tournament {
    Tournament {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn player_from_row(row: &PgRow) -> Player {
    Player {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn match_from_row(row: &PgRow) -> MatchRecord {
    MatchRecord {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        winner_id: row.get("winner_id"),
        loser_id: row.get("loser_id"),
        recorded_at: row.get::<chrono::NaiveDateTime, _>("recorded_at").and_utc(),
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn ensure_tournament(&self, name: &str) -> SwissResult<Tournament> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let row = self
            .run(
                sqlx::query(
                    r#"
                    INSERT INTO tournaments (name) VALUES ($1)
                    ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                    RETURNING id, name, created_at
                    "#,
                )
                .bind(name)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(tournament_from_row(&row))
    }

    async fn find_tournament(&self, name: &str) -> SwissResult<Option<Tournament>> {
        let row = self
            .run(
                sqlx::query("SELECT id, name, created_at FROM tournaments WHERE name = $1")
                    .bind(name)
                    .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> SwissResult<Option<Tournament>> {
        let row = self
            .run(
                sqlx::query("SELECT id, name, created_at FROM tournaments WHERE id = $1")
                    .bind(tournament_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn find_player_by_name(&self, name: &str) -> SwissResult<Option<Player>> {
        let row = self
            .run(
                sqlx::query("SELECT id, name FROM players WHERE name = $1 ORDER BY id LIMIT 1")
                    .bind(name)
                    .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.as_ref().map(player_from_row))
    }

    async fn insert_player(&self, name: &str) -> SwissResult<Player> {
        let row = self
            .run(
                sqlx::query("INSERT INTO players (name) VALUES ($1) RETURNING id, name")
                    .bind(name)
                    .fetch_one(&self.pool),
            )
            .await?;

        Ok(player_from_row(&row))
    }

    async fn insert_enrollment(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<bool> {
        let result = self
            .run(
                sqlx::query(
                    r#"
                    INSERT INTO enrollments (player_id, tournament_id) VALUES ($1, $2)
                    ON CONFLICT (player_id, tournament_id) DO NOTHING
                    "#,
                )
                .bind(player_id)
                .bind(tournament_id)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_enrollments(&self, tournament_id: TournamentId) -> SwissResult<usize> {
        let row = self
            .run(
                sqlx::query("SELECT COUNT(*) AS count FROM enrollments WHERE tournament_id = $1")
                    .bind(tournament_id)
                    .fetch_one(&self.pool),
            )
            .await?;

        let count: i64 = row.get("count");
        usize::try_from(count)
            .map_err(|e| SwissError::from(sqlx::Error::Decode(Box::new(e))))
    }

    async fn enrolled_players(&self, tournament_id: TournamentId) -> SwissResult<Vec<Player>> {
        let rows = self
            .run(
                sqlx::query(
                    r#"
                    SELECT p.id, p.name
                    FROM players p
                    JOIN enrollments e ON e.player_id = p.id
                    WHERE e.tournament_id = $1
                    ORDER BY p.id
                    "#,
                )
                .bind(tournament_id)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.iter().map(player_from_row).collect())
    }

    async fn insert_match(
        &self,
        winner_id: PlayerId,
        loser_id: PlayerId,
        tournament_id: TournamentId,
    ) -> SwissResult<Option<MatchRecord>> {
        let row = self
            .run(
                sqlx::query(
                    r#"
                    INSERT INTO matches (tournament_id, winner_id, loser_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT DO NOTHING
                    RETURNING id, tournament_id, winner_id, loser_id, recorded_at
                    "#,
                )
                .bind(tournament_id)
                .bind(winner_id)
                .bind(loser_id)
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.as_ref().map(match_from_row))
    }

    async fn matches(&self, tournament_id: TournamentId) -> SwissResult<Vec<MatchRecord>> {
        let rows = self
            .run(
                sqlx::query(
                    r#"
                    SELECT id, tournament_id, winner_id, loser_id, recorded_at
                    FROM matches
                    WHERE tournament_id = $1
                    ORDER BY id
                    "#,
                )
                .bind(tournament_id)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn players_without_bye(
        &self,
        tournament_id: TournamentId,
    ) -> SwissResult<Vec<PlayerId>> {
        let rows = self
            .run(
                sqlx::query(
                    r#"
                    SELECT e.player_id
                    FROM enrollments e
                    WHERE e.tournament_id = $1
                      AND NOT EXISTS (
                          SELECT 1 FROM matches m
                          WHERE m.tournament_id = e.tournament_id
                            AND m.winner_id = e.player_id
                            AND m.loser_id = $2
                      )
                    ORDER BY e.player_id
                    "#,
                )
                .bind(tournament_id)
                .bind(BYE_PLAYER_ID)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.iter().map(|r| r.get("player_id")).collect())
    }

    async fn delete_matches(&self, tournament_id: TournamentId) -> SwissResult<u64> {
        let result = self
            .run(
                sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
                    .bind(tournament_id)
                    .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_matches(&self) -> SwissResult<u64> {
        let result = self
            .run(sqlx::query("DELETE FROM matches").execute(&self.pool))
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_enrollments(&self, tournament_id: TournamentId) -> SwissResult<u64> {
        let result = self
            .run(
                sqlx::query("DELETE FROM enrollments WHERE tournament_id = $1")
                    .bind(tournament_id)
                    .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_players(&self) -> SwissResult<u64> {
        self.run(async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM enrollments")
                .execute(&mut *tx)
                .await?;
            // Matches reference winners by foreign key
            sqlx::query("DELETE FROM matches").execute(&mut *tx).await?;
            let result = sqlx::query("DELETE FROM players").execute(&mut *tx).await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(result.rows_affected())
        })
        .await
    }
}
