//! # Muster Core
//!
//! Core types and business operations for Muster, a roster scheduler for
//! community content events. An event carries a fixed roster of role slots
//! spread across up to four catalog groups; participants race to claim
//! slots, and the system guarantees that no two participants ever hold the
//! same slot concurrently.
//!
//! ## Components
//!
//! - [`slot`]: the codec between `(group position, role index)` pairs and
//!   their stored token form
//! - [`event`]: the guild aggregate and its content events
//! - [`store`]: the persistence abstraction; all mutation is a single
//!   atomic operation against the owning guild document
//! - [`service`]: create / claim / release / fetch, with validation and
//!   bounded retries
//! - [`projection`]: the read side — reconstructing "who holds which slot"
//!   joined with catalog metadata for display
//!
//! ## Concurrency guarantee
//!
//! For a fixed `(event, token)` pair, at most one claim across the whole
//! system observes success while the token is held. The coordination point
//! is the storage layer's atomic conditional update, never an in-process
//! lock: see [`store::EventStore::try_claim`].
//!
//! ## Example
//!
//! ```ignore
//! use muster_core::service::EventService;
//! use muster_core::slot::Slot;
//!
//! let service = EventService::new(store, clock);
//! let event = service.create_event(guild_id, guild_name, draft).await?;
//!
//! match service.claim_slot(event.uuid, participant, Slot::new(1, 2)).await? {
//!     ClaimResult::Claimed => { /* announce */ }
//!     ClaimResult::SlotTaken => { /* tell the user, nothing changed */ }
//! }
//! ```

pub mod environment;
pub mod event;
pub mod ids;
pub mod projection;
pub mod service;
pub mod slot;
pub mod store;

// Re-export commonly used types
pub use environment::{Clock, SystemClock};
pub use event::{ContentEvent, EventDraft, Guild};
pub use ids::{EventUuid, GroupId, GuildId, ParticipantId, RoleId};
pub use service::{ClaimResult, EventService, ServiceError};
pub use slot::{DecodeSlotError, Slot, SlotToken};
pub use store::{EventStore, EventStoreError};
