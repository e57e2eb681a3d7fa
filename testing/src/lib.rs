//! # Muster Testing
//!
//! Testing utilities and fakes for the Muster workspace:
//!
//! - [`mocks::InMemoryEventStore`]: a deterministic, in-process event store
//! - [`mocks::FixedClock`]: a clock that never moves
//! - [`mocks::StaticRosterResolver`]: a catalog lookup backed by fixed maps
//!
//! ## Example
//!
//! ```ignore
//! use muster_testing::mocks::{InMemoryEventStore, test_clock};
//! use muster_core::service::EventService;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_claim_flow() {
//!     let service = EventService::new(
//!         Arc::new(InMemoryEventStore::new()),
//!         Arc::new(test_clock()),
//!     );
//!     // ...
//! }
//! ```

/// Mock implementations of the core's seams.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use muster_core::environment::Clock;
    use muster_core::event::{ContentEvent, Guild};
    use muster_core::ids::{EventUuid, GroupId, GuildId, ParticipantId, RoleId};
    use muster_core::projection::{GroupInfo, RoleInfo, RosterError, RosterResolver};
    use muster_core::slot::SlotToken;
    use muster_core::store::{EventStore, EventStoreError};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making timestamp assertions exact.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory event store for fast, deterministic tests.
    ///
    /// A single async mutex guards the whole guild map, so every operation
    /// — including the check-and-set inside [`EventStore::try_claim`] — is
    /// atomic with respect to every other. That makes this store a valid
    /// implementation of the slot-exclusivity contract, not just a stub.
    ///
    /// `inject_conflicts` can seed a number of artificial
    /// [`EventStoreError::ConcurrencyConflict`] results to exercise caller
    /// retry paths; real claims resume once the budget is consumed.
    pub struct InMemoryEventStore {
        guilds: Mutex<HashMap<GuildId, Guild>>,
        clock: Arc<dyn Clock>,
        pending_conflicts: AtomicU32,
    }

    impl InMemoryEventStore {
        /// Create an empty store using the system clock for `updated_at`
        /// bumps.
        #[must_use]
        pub fn new() -> Self {
            Self::with_clock(Arc::new(muster_core::environment::SystemClock))
        }

        /// Create an empty store with an injected clock.
        #[must_use]
        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            Self {
                guilds: Mutex::new(HashMap::new()),
                clock,
                pending_conflicts: AtomicU32::new(0),
            }
        }

        /// Make the next `count` claim attempts fail with a transient
        /// concurrency conflict before behaving normally again.
        pub fn inject_conflicts(&self, count: u32) {
            self.pending_conflicts.store(count, Ordering::SeqCst);
        }

        /// Snapshot a guild aggregate, if present.
        pub async fn guild(&self, guild_id: &GuildId) -> Option<Guild> {
            self.guilds.lock().await.get(guild_id).cloned()
        }

        fn take_pending_conflict(&self) -> bool {
            self.pending_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    current.checked_sub(1)
                })
                .is_ok()
        }
    }

    impl Default for InMemoryEventStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EventStore for InMemoryEventStore {
        fn create(
            &self,
            guild_id: GuildId,
            guild_name: String,
            event: ContentEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
            Box::pin(async move {
                let now = self.clock.now();
                let mut guilds = self.guilds.lock().await;
                let guild = guilds.entry(guild_id.clone()).or_insert_with(|| Guild {
                    guild_id,
                    guild_name: guild_name.clone(),
                    events: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
                guild.guild_name = guild_name;
                guild.updated_at = now;
                guild.events.push(event);
                Ok(())
            })
        }

        fn find_by_uuid(
            &self,
            event_uuid: EventUuid,
        ) -> Pin<Box<dyn Future<Output = Result<ContentEvent, EventStoreError>> + Send + '_>>
        {
            Box::pin(async move {
                let guilds = self.guilds.lock().await;
                guilds
                    .values()
                    .find_map(|guild| guild.event(event_uuid))
                    .cloned()
                    .ok_or(EventStoreError::EventNotFound(event_uuid))
            })
        }

        fn try_claim(
            &self,
            event_uuid: EventUuid,
            participant: ParticipantId,
            token: SlotToken,
        ) -> Pin<Box<dyn Future<Output = Result<bool, EventStoreError>> + Send + '_>> {
            Box::pin(async move {
                if self.take_pending_conflict() {
                    return Err(EventStoreError::ConcurrencyConflict(event_uuid));
                }

                let now = self.clock.now();
                let mut guilds = self.guilds.lock().await;
                let guild = guilds
                    .values_mut()
                    .find(|guild| guild.event(event_uuid).is_some())
                    .ok_or(EventStoreError::EventNotFound(event_uuid))?;

                // The lock is held across check and set, so this pair is
                // atomic with respect to every other store operation.
                let event = guild
                    .event_mut(event_uuid)
                    .ok_or(EventStoreError::EventNotFound(event_uuid))?;
                if event.token_taken(&token) {
                    return Ok(false);
                }
                event.assignments.insert(participant, token);
                event.updated_at = now;
                guild.updated_at = now;
                Ok(true)
            })
        }

        fn release(
            &self,
            event_uuid: EventUuid,
            participant: ParticipantId,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
            Box::pin(async move {
                let now = self.clock.now();
                let mut guilds = self.guilds.lock().await;
                // Missing event, missing assignment, both are no-ops.
                let Some(guild) = guilds
                    .values_mut()
                    .find(|guild| guild.event(event_uuid).is_some())
                else {
                    return Ok(());
                };

                if let Some(event) = guild.event_mut(event_uuid) {
                    if event.assignments.remove(&participant).is_some() {
                        event.updated_at = now;
                        guild.updated_at = now;
                    }
                }
                Ok(())
            })
        }
    }

    /// Roster catalog lookup backed by fixed maps.
    #[derive(Default)]
    pub struct StaticRosterResolver {
        groups: HashMap<GroupId, GroupInfo>,
        roles: HashMap<RoleId, RoleInfo>,
    }

    impl StaticRosterResolver {
        /// Create an empty resolver (every lookup returns `None`).
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a group and its ordered roles, each role given as
        /// `(role id, display name)`.
        #[must_use]
        pub fn with_group(
            mut self,
            group_id: impl Into<GroupId>,
            name: impl Into<String>,
            roles: Vec<(RoleId, String)>,
        ) -> Self {
            let role_ids = roles.iter().map(|(id, _)| id.clone()).collect();
            self.groups.insert(
                group_id.into(),
                GroupInfo {
                    name: name.into(),
                    role_ids,
                },
            );
            for (role_id, role_name) in roles {
                self.roles.insert(role_id, RoleInfo { name: role_name });
            }
            self
        }
    }

    impl RosterResolver for StaticRosterResolver {
        fn resolve_group(
            &self,
            group_id: &GroupId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<GroupInfo>, RosterError>> + Send + '_>>
        {
            let info = self.groups.get(group_id).cloned();
            Box::pin(async move { Ok(info) })
        }

        fn resolve_role(
            &self,
            role_id: &RoleId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<RoleInfo>, RosterError>> + Send + '_>>
        {
            let info = self.roles.get(role_id).cloned();
            Box::pin(async move { Ok(info) })
        }
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, InMemoryEventStore, StaticRosterResolver};

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::environment::Clock;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }
}
