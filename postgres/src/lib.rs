//! `PostgreSQL` event store implementation for Muster.
//!
//! This crate provides the production implementation of the
//! [`EventStore`] trait from `muster-core`, backed by `PostgreSQL` via sqlx.
//!
//! # Storage shape
//!
//! The guild-aggregate document is modeled relationally. Events and slot
//! assignments are child tables keyed by the event uuid, and the core
//! invariant — at most one participant per slot token — rides on a unique
//! constraint:
//!
//! ```sql
//! CONSTRAINT slot_assignments_token_key UNIQUE (event_uuid, token)
//! ```
//!
//! With the constraint in place, insert-or-fail *is* the atomic check-and-set:
//! the database evaluates "token not present" and the write as one operation,
//! with no intervening read visible to other writers. No application-level
//! check-then-write exists anywhere on the claim path.
//!
//! # Exported Metrics
//!
//! - `muster_slot_claims_total{outcome}` — claim attempts by outcome
//!   (`claimed`, `taken`)
//! - `muster_slot_releases_total` — released assignments
//!
//! # Example
//!
//! ```ignore
//! use muster_postgres::{PostgresConfig, PostgresEventStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresEventStore::connect(&PostgresConfig::from_env()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

mod config;

pub use config::PostgresConfig;

use chrono::{DateTime, Utc};
use muster_core::event::ContentEvent;
use muster_core::ids::{EventUuid, GroupId, GuildId, ParticipantId};
use muster_core::slot::SlotToken;
use muster_core::store::{EventStore, EventStoreError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL-backed event store.
///
/// Cheap to clone; the inner pool is reference-counted.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

/// Row shape for `content_events`, joined with its assignments separately.
#[derive(sqlx::FromRow)]
struct EventRow {
    uuid: Uuid,
    scheduled_at: DateTime<Utc>,
    title: String,
    description: String,
    created_by: String,
    tags: Vec<String>,
    group_ids: Vec<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    fn into_event(self, assignments: Vec<(String, String)>) -> ContentEvent {
        ContentEvent {
            uuid: EventUuid::from_uuid(self.uuid),
            scheduled_at: self.scheduled_at,
            title: self.title,
            description: self.description,
            created_by: ParticipantId::new(self.created_by),
            tags: self.tags,
            group_ids: self.group_ids.into_iter().map(GroupId::new).collect(),
            location: self.location,
            assignments: assignments
                .into_iter()
                .map(|(participant, token)| (ParticipantId::new(participant), SlotToken::new(token)))
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl PostgresEventStore {
    /// Create a store from an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::DatabaseError`] if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, EventStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self::from_pool(pool))
    }

    /// Run database migrations.
    ///
    /// Creates the `guilds`, `content_events`, and `slot_assignments` tables
    /// if they don't already exist.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::DatabaseError`] if migration fails.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch the owning guild id of an event, inside a transaction.
    async fn guild_of_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_uuid: EventUuid,
    ) -> Result<String, EventStoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT guild_id FROM content_events WHERE uuid = $1")
                .bind(event_uuid.as_uuid())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| EventStoreError::DatabaseError(format!("Failed to look up event: {e}")))?;

        row.map(|(guild_id,)| guild_id)
            .ok_or(EventStoreError::EventNotFound(event_uuid))
    }

    /// Bump `updated_at` on an event and its owning guild, inside a
    /// transaction that already mutated an assignment.
    async fn touch(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_uuid: EventUuid,
        guild_id: &str,
    ) -> Result<(), EventStoreError> {
        sqlx::query("UPDATE content_events SET updated_at = now() WHERE uuid = $1")
            .bind(event_uuid.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to touch event: {e}")))?;

        sqlx::query("UPDATE guilds SET updated_at = now() WHERE guild_id = $1")
            .bind(guild_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to touch guild: {e}")))?;

        Ok(())
    }
}

impl EventStore for PostgresEventStore {
    fn create(
        &self,
        guild_id: GuildId,
        guild_name: String,
        event: ContentEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to begin transaction: {e}"))
            })?;

            sqlx::query(
                "INSERT INTO guilds (guild_id, guild_name, created_at, updated_at)
                 VALUES ($1, $2, $3, $3)
                 ON CONFLICT (guild_id) DO UPDATE
                 SET guild_name = EXCLUDED.guild_name, updated_at = EXCLUDED.updated_at",
            )
            .bind(guild_id.as_str())
            .bind(&guild_name)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to upsert guild: {e}")))?;

            let group_ids: Vec<String> = event
                .group_ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect();

            sqlx::query(
                "INSERT INTO content_events
                     (uuid, guild_id, scheduled_at, title, description, created_by,
                      tags, group_ids, location, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(event.uuid.as_uuid())
            .bind(guild_id.as_str())
            .bind(event.scheduled_at)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.created_by.as_str())
            .bind(&event.tags)
            .bind(&group_ids)
            .bind(&event.location)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to insert event: {e}")))?;

            // Events are created with an empty assignment map, but a store
            // must not silently drop state if handed one that isn't.
            for (participant, token) in &event.assignments {
                sqlx::query(
                    "INSERT INTO slot_assignments (event_uuid, participant_id, token)
                     VALUES ($1, $2, $3)",
                )
                .bind(event.uuid.as_uuid())
                .bind(participant.as_str())
                .bind(token.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    EventStoreError::DatabaseError(format!("Failed to insert assignment: {e}"))
                })?;
            }

            tx.commit().await.map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to commit transaction: {e}"))
            })?;

            tracing::info!(
                event_uuid = %event.uuid,
                guild_id = %guild_id,
                "Content event persisted"
            );
            metrics::counter!("muster_events_created_total").increment(1);

            Ok(())
        })
    }

    fn find_by_uuid(
        &self,
        event_uuid: EventUuid,
    ) -> Pin<Box<dyn Future<Output = Result<ContentEvent, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let row: Option<EventRow> = sqlx::query_as(
                "SELECT uuid, scheduled_at, title, description, created_by,
                        tags, group_ids, location, created_at, updated_at
                 FROM content_events
                 WHERE uuid = $1",
            )
            .bind(event_uuid.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to load event: {e}")))?;

            let row = row.ok_or(EventStoreError::EventNotFound(event_uuid))?;

            let assignments: Vec<(String, String)> = sqlx::query_as(
                "SELECT participant_id, token FROM slot_assignments WHERE event_uuid = $1",
            )
            .bind(event_uuid.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to load assignments: {e}"))
            })?;

            Ok(row.into_event(assignments))
        })
    }

    fn try_claim(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
        token: SlotToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to begin transaction: {e}"))
            })?;

            // Events are never deleted, so this lookup cannot race with the
            // claim below; it exists to classify "missing event" apart from
            // constraint errors and to find the guild row to touch.
            let guild_id = Self::guild_of_event(&mut tx, event_uuid).await?;

            // The whole claim condition lives in this one statement. The
            // token-uniqueness constraint rejects a taken slot; the WHERE
            // clause makes re-claiming one's own identical token a no-op
            // (zero rows), matching "taken" semantics.
            let result = sqlx::query(
                "INSERT INTO slot_assignments (event_uuid, participant_id, token)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (event_uuid, participant_id) DO UPDATE
                 SET token = EXCLUDED.token, claimed_at = now()
                 WHERE slot_assignments.token IS DISTINCT FROM EXCLUDED.token",
            )
            .bind(event_uuid.as_uuid())
            .bind(participant.as_str())
            .bind(token.as_str())
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => {
                    Self::touch(&mut tx, event_uuid, &guild_id).await?;
                    tx.commit().await.map_err(|e| {
                        EventStoreError::DatabaseError(format!(
                            "Failed to commit transaction: {e}"
                        ))
                    })?;
                    metrics::counter!("muster_slot_claims_total", "outcome" => "claimed")
                        .increment(1);
                    Ok(true)
                }
                Ok(_) => {
                    // Zero rows: the participant already holds exactly this
                    // token. The slot is taken (by them); nothing changed.
                    tx.rollback().await.ok();
                    metrics::counter!("muster_slot_claims_total", "outcome" => "taken")
                        .increment(1);
                    Ok(false)
                }
                Err(error) if is_token_conflict(&error) => {
                    tx.rollback().await.ok();
                    tracing::debug!(
                        event_uuid = %event_uuid,
                        participant = %participant,
                        token = %token,
                        "Claim lost to existing assignment"
                    );
                    metrics::counter!("muster_slot_claims_total", "outcome" => "taken")
                        .increment(1);
                    Ok(false)
                }
                Err(error) => Err(EventStoreError::DatabaseError(format!(
                    "Failed to claim slot: {error}"
                ))),
            }
        })
    }

    fn release(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to begin transaction: {e}"))
            })?;

            // Release is idempotent all the way down: no assignment, or no
            // such event at all, both land on the zero-row branch.
            let deleted = sqlx::query(
                "DELETE FROM slot_assignments WHERE event_uuid = $1 AND participant_id = $2",
            )
            .bind(event_uuid.as_uuid())
            .bind(participant.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| EventStoreError::DatabaseError(format!("Failed to release slot: {e}")))?
            .rows_affected();

            if deleted > 0 {
                // The assignment's foreign key guarantees the event row
                // exists here.
                let guild_id = Self::guild_of_event(&mut tx, event_uuid).await?;
                Self::touch(&mut tx, event_uuid, &guild_id).await?;
                metrics::counter!("muster_slot_releases_total").increment(1);
            }

            tx.commit().await.map_err(|e| {
                EventStoreError::DatabaseError(format!("Failed to commit transaction: {e}"))
            })?;

            Ok(())
        })
    }
}

/// Whether a sqlx error is a unique violation on the slot token constraint.
fn is_token_conflict(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some("slot_assignments_token_key"))
}
