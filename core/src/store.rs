//! Event store trait and related types.
//!
//! This module defines the persistence abstraction for guild aggregates.
//! Every mutation is expressed as a single atomic operation against the
//! owning guild document — never a read-modify-write pair from the caller's
//! perspective, because splitting the check and the write across two round
//! trips is exactly the race this design exists to eliminate.
//!
//! # Implementations
//!
//! - `PostgresEventStore` (in `muster-postgres`): production implementation;
//!   slot exclusivity rides on a unique constraint, so insert-or-fail is the
//!   atomic primitive.
//! - `InMemoryEventStore` (in `muster-testing`): fast, deterministic testing;
//!   a single async mutex makes each operation atomic.
//!
//! # Example
//!
//! ```no_run
//! use muster_core::store::{EventStore, EventStoreError};
//! use muster_core::ids::{EventUuid, ParticipantId};
//! use muster_core::slot::Slot;
//!
//! async fn example<S: EventStore>(store: &S, uuid: EventUuid) -> Result<(), EventStoreError> {
//!     let token = Slot::new(1, 2).encode(true);
//!     let claimed = store
//!         .try_claim(uuid, ParticipantId::new("u1"), token)
//!         .await?;
//!
//!     if !claimed {
//!         // Slot already held by someone; a normal outcome, not an error.
//!     }
//!     Ok(())
//! }
//! ```

use crate::event::ContentEvent;
use crate::ids::{EventUuid, GuildId, ParticipantId};
use crate::slot::SlotToken;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// No event with the given uuid exists in any guild aggregate.
    #[error("Event not found: {0}")]
    EventNotFound(EventUuid),

    /// Transient conflict between concurrent writers.
    ///
    /// Only produced by implementations that fall back to an
    /// optimistic-concurrency scheme (version-guarded writes). Callers retry
    /// a bounded number of times before surfacing a transient error;
    /// implementations whose atomic predicate is evaluated by the store
    /// itself never produce this.
    #[error("Concurrency conflict on event {0}")]
    ConcurrencyConflict(EventUuid),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Persistence abstraction for guild aggregates and their content events.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely used in async contexts
/// and shared across tasks.
///
/// # Atomicity
///
/// [`EventStore::try_claim`] is the correctness-critical operation: its
/// condition ("token not present as any assignment value") and its mutation
/// must be evaluated by the store without an intervening read visible to
/// other writers. For a fixed `(event, token)` pair, at most one `try_claim`
/// across the system may observe success while the token is held.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` to enable trait object usage (`Arc<dyn EventStore>`), which is
/// how the service layer holds its store.
pub trait EventStore: Send + Sync {
    /// Upsert the guild aggregate and append `event` to its sequence.
    ///
    /// Creates the guild document if absent (idempotent on guild identity)
    /// and always appends the event (never idempotent on event identity —
    /// every call stores a new event under its fresh uuid). The guild name
    /// is refreshed on every call, matching the latest caller-supplied value.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: connection or query failed
    /// - `SerializationError`: the event could not be persisted
    fn create(
        &self,
        guild_id: GuildId,
        guild_name: String,
        event: ContentEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>>;

    /// Locate the event with this uuid and return its current state.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: no guild aggregate contains this event
    /// - `DatabaseError`: connection or query failed
    fn find_by_uuid(
        &self,
        event_uuid: EventUuid,
    ) -> Pin<Box<dyn Future<Output = Result<ContentEvent, EventStoreError>> + Send + '_>>;

    /// Atomically claim a slot token for a participant.
    ///
    /// Within a single storage-layer update: verify that `token` is not
    /// currently present as *any* value in the event's assignment map, and
    /// if so set `assignments[participant] = token` (replacing any other
    /// token that participant held) and bump `updated_at`.
    ///
    /// Returns `true` on success and `false` when the token is already
    /// taken — including when the caller already holds this exact token.
    /// A prior claim by the same participant to a *different* slot is left
    /// untouched on failure: the store enforces slot exclusivity, not
    /// participant exclusivity.
    ///
    /// Either outcome is total: the claim fully succeeds or leaves no state
    /// change, never a partial write.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: no guild aggregate contains this event
    /// - `ConcurrencyConflict`: transient version conflict (optimistic
    ///   implementations only; callers should retry)
    /// - `DatabaseError`: connection or query failed
    fn try_claim(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
        token: SlotToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, EventStoreError>> + Send + '_>>;

    /// Atomically remove a participant's assignment, if present.
    ///
    /// Idempotent throughout: a participant without an assignment is a
    /// no-op, and so is a missing event — release must always succeed
    /// against any addressable state, held or not.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: connection or query failed
    fn release(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_not_found_error_display() {
        let uuid = EventUuid::new();
        let error = EventStoreError::EventNotFound(uuid);
        let display = format!("{error}");
        assert!(display.contains(&uuid.to_string()));
    }

    #[test]
    fn concurrency_conflict_error_display() {
        let uuid = EventUuid::new();
        let error = EventStoreError::ConcurrencyConflict(uuid);
        let display = format!("{error}");
        assert!(display.contains("Concurrency conflict"));
    }

    #[test]
    fn database_error_display() {
        let error = EventStoreError::DatabaseError("connection refused".to_string());
        assert!(format!("{error}").contains("connection refused"));
    }
}
