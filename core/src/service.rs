//! Business operations over the event store.
//!
//! `EventService` orchestrates the slot codec and the store behind a
//! roster-shaped API: create an event, claim a slot, release a slot, fetch
//! an event. It owns input validation and the bounded retry policy for
//! transient storage conflicts; the mutual-exclusion guarantee itself lives
//! in the store.
//!
//! A slot moves `Open → Held(participant)` on a successful claim and back to
//! `Open` on release; a claim attempt against a held slot returns
//! [`ClaimResult::SlotTaken`] and changes nothing. There is no locked or
//! expired state — hold timeouts are a policy extension, not part of this
//! core.

use crate::environment::Clock;
use crate::event::{ContentEvent, EventDraft, MAX_GROUPS, MIN_GROUPS};
use crate::ids::{EventUuid, GuildId, ParticipantId};
use crate::slot::Slot;
use crate::store::{EventStore, EventStoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Attempts made against a transient [`EventStoreError::ConcurrencyConflict`]
/// before surfacing [`ServiceError::Transient`].
const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// Base delay for the claim retry backoff; doubles per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Errors surfaced by [`EventService`] operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed input: group count out of range, empty required field,
    /// out-of-range group position. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced event does not exist.
    #[error("Event not found: {0}")]
    NotFound(EventUuid),

    /// A transient storage conflict persisted past the retry budget.
    #[error("Transient storage conflict: {0}")]
    Transient(String),

    /// The store failed in a non-transient way.
    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),
}

/// Outcome of a claim attempt.
///
/// Contention is an expected, normal outcome — a result variant, not an
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimResult {
    /// The slot was free and is now held by the caller.
    Claimed,
    /// The slot is held by someone; nothing changed.
    SlotTaken,
}

/// Business operations for content events.
///
/// Holds the store and clock behind `Arc<dyn ...>` so it can be cloned into
/// request handlers cheaply.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Create a new service over the given store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a new content event inside a guild.
    ///
    /// Validates the draft (1 to 4 groups; non-empty title, description and
    /// creator), generates the event uuid, stamps timestamps, and writes
    /// through the store. Returns the stored event.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] when the draft is malformed
    /// - [`ServiceError::Store`] when persistence fails
    pub async fn create_event(
        &self,
        guild_id: GuildId,
        guild_name: String,
        draft: EventDraft,
    ) -> Result<ContentEvent, ServiceError> {
        validate_draft(&draft)?;

        let now = self.clock.now();
        let event = ContentEvent {
            uuid: EventUuid::new(),
            scheduled_at: draft.scheduled_at,
            title: draft.title,
            description: draft.description,
            created_by: draft.created_by,
            tags: draft.tags,
            group_ids: draft.group_ids,
            location: draft.location,
            assignments: HashMap::new(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .create(guild_id.clone(), guild_name, event.clone())
            .await?;

        tracing::info!(
            event_uuid = %event.uuid,
            guild_id = %guild_id,
            groups = event.group_ids.len(),
            "Content event created"
        );

        Ok(event)
    }

    /// Attempt to claim a slot for a participant.
    ///
    /// Loads the event to determine its token shape and to validate the
    /// group position, encodes the token, and delegates to the store's
    /// atomic claim. Transient conflicts are retried with backoff up to
    /// [`MAX_CLAIM_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] when the slot is out of range for the
    ///   event
    /// - [`ServiceError::NotFound`] when the event does not exist
    /// - [`ServiceError::Transient`] when the retry budget is exhausted
    /// - [`ServiceError::Store`] on non-transient store failures
    pub async fn claim_slot(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
        slot: Slot,
    ) -> Result<ClaimResult, ServiceError> {
        let event = self.get_event(event_uuid).await?;

        if slot.group_position == 0 || slot.group_position as usize > event.group_count() {
            return Err(ServiceError::Validation(format!(
                "group position {} is out of range for this event (1..={})",
                slot.group_position,
                event.group_count()
            )));
        }
        if slot.role_index == 0 {
            return Err(ServiceError::Validation(
                "role index must be at least 1".to_string(),
            ));
        }

        let token = slot.encode(event.multi_group());

        let mut attempt = 0;
        let claimed = loop {
            attempt += 1;
            match self
                .store
                .try_claim(event_uuid, participant.clone(), token.clone())
                .await
            {
                Ok(claimed) => break claimed,
                Err(EventStoreError::ConcurrencyConflict(uuid)) => {
                    if attempt >= MAX_CLAIM_ATTEMPTS {
                        return Err(ServiceError::Transient(format!(
                            "claim on event {uuid} still conflicting after {attempt} attempts"
                        )));
                    }
                    let delay = RETRY_BACKOFF * 2u32.saturating_pow(attempt - 1);
                    tracing::debug!(
                        event_uuid = %uuid,
                        attempt,
                        ?delay,
                        "Retrying claim after concurrency conflict"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(EventStoreError::EventNotFound(uuid)) => {
                    return Err(ServiceError::NotFound(uuid));
                }
                Err(other) => return Err(other.into()),
            }
        };

        if claimed {
            tracing::info!(
                event_uuid = %event_uuid,
                participant = %participant,
                token = %token,
                "Slot claimed"
            );
            Ok(ClaimResult::Claimed)
        } else {
            tracing::debug!(
                event_uuid = %event_uuid,
                participant = %participant,
                token = %token,
                "Slot already taken"
            );
            Ok(ClaimResult::SlotTaken)
        }
    }

    /// Release a participant's slot, if they hold one.
    ///
    /// Idempotent: releasing a participant with no current assignment, or
    /// against an event that does not exist, succeeds without mutating
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Store`] when persistence fails
    pub async fn release_slot(
        &self,
        event_uuid: EventUuid,
        participant: ParticipantId,
    ) -> Result<(), ServiceError> {
        self.store.release(event_uuid, participant.clone()).await?;
        tracing::info!(
            event_uuid = %event_uuid,
            participant = %participant,
            "Slot released"
        );
        Ok(())
    }

    /// Fetch an event by uuid.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] when no guild aggregate contains the
    ///   event
    /// - [`ServiceError::Store`] when the lookup fails
    pub async fn get_event(&self, event_uuid: EventUuid) -> Result<ContentEvent, ServiceError> {
        match self.store.find_by_uuid(event_uuid).await {
            Ok(event) => Ok(event),
            Err(EventStoreError::EventNotFound(uuid)) => Err(ServiceError::NotFound(uuid)),
            Err(other) => Err(other.into()),
        }
    }
}

fn validate_draft(draft: &EventDraft) -> Result<(), ServiceError> {
    let group_count = draft.group_ids.len();
    if !(MIN_GROUPS..=MAX_GROUPS).contains(&group_count) {
        return Err(ServiceError::Validation(format!(
            "an event requires {MIN_GROUPS} to {MAX_GROUPS} groups, got {group_count}"
        )));
    }
    if draft.title.trim().is_empty() {
        return Err(ServiceError::Validation("title must not be empty".to_string()));
    }
    if draft.description.trim().is_empty() {
        return Err(ServiceError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    if draft.created_by.as_str().is_empty() {
        return Err(ServiceError::Validation(
            "creator must not be empty".to_string(),
        ));
    }
    Ok(())
}
