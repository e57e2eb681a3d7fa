//! The guild aggregate and its content events.
//!
//! A guild owns an ordered sequence of content events; the guild document is
//! the unit of storage locality and of atomic update. Events are created once
//! with an immutable shape (title, description, schedule, creator, ordered
//! `group_ids`) and afterwards only their assignment map and `updated_at`
//! change, via claim/release.

use crate::ids::{EventUuid, GroupId, GuildId, ParticipantId};
use crate::slot::SlotToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound on the number of groups an event may reference.
pub const MIN_GROUPS: usize = 1;

/// Upper bound on the number of groups an event may reference.
pub const MAX_GROUPS: usize = 4;

/// A scheduled content event within a guild.
///
/// `group_ids` order is significant: it defines the 1-based group positions
/// used by the slot codec, and it is fixed at creation. `assignments` maps
/// each participant to at most one slot token, and a token appears at most
/// once across the whole map (slot exclusivity, enforced by the store).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEvent {
    /// Globally unique identifier, generated at creation.
    pub uuid: EventUuid,
    /// When the event takes place (UTC).
    pub scheduled_at: DateTime<Utc>,
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Participant who created the event.
    pub created_by: ParticipantId,
    /// Free-form tags; insertion order is irrelevant.
    pub tags: Vec<String>,
    /// Ordered catalog group references, 1 to 4 of them.
    pub group_ids: Vec<GroupId>,
    /// Optional location (in-game or real-world).
    pub location: Option<String>,
    /// Participant-to-slot assignment map.
    pub assignments: HashMap<ParticipantId, SlotToken>,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
    /// When the event was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl ContentEvent {
    /// Number of groups attached to this event.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_ids.len()
    }

    /// Whether this event spans more than one group.
    ///
    /// Determines the token shape used by the slot codec.
    #[must_use]
    pub fn multi_group(&self) -> bool {
        self.group_ids.len() > 1
    }

    /// Look up the slot token currently held by a participant, if any.
    #[must_use]
    pub fn token_for(&self, participant: &ParticipantId) -> Option<&SlotToken> {
        self.assignments.get(participant)
    }

    /// Whether the given token is held by any participant.
    #[must_use]
    pub fn token_taken(&self, token: &SlotToken) -> bool {
        self.assignments.values().any(|held| held == token)
    }
}

/// Validated parameters for creating a [`ContentEvent`].
///
/// Carries everything the caller supplies; the service adds the generated
/// uuid, the empty assignment map, and timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// When the event takes place (UTC).
    pub scheduled_at: DateTime<Utc>,
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Participant creating the event.
    pub created_by: ParticipantId,
    /// Ordered catalog group references.
    pub group_ids: Vec<GroupId>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Optional location.
    pub location: Option<String>,
}

/// The guild aggregate: one document per community.
///
/// All mutations to an event happen via an update scoped to its owning
/// guild document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// Unique guild identifier.
    pub guild_id: GuildId,
    /// Human-readable guild name, refreshed on every create.
    pub guild_name: String,
    /// Ordered sequence of content events.
    pub events: Vec<ContentEvent>,
    /// When the aggregate was first created.
    pub created_at: DateTime<Utc>,
    /// When the aggregate was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Guild {
    /// Find an event in this guild by its uuid.
    #[must_use]
    pub fn event(&self, uuid: EventUuid) -> Option<&ContentEvent> {
        self.events.iter().find(|event| event.uuid == uuid)
    }

    /// Find an event in this guild by its uuid, mutably.
    pub fn event_mut(&mut self, uuid: EventUuid) -> Option<&mut ContentEvent> {
        self.events.iter_mut().find(|event| event.uuid == uuid)
    }
}
