//! End-to-end roster projection over the test doubles.
//!
//! Claims flow through `EventService` into `InMemoryEventStore`, then the
//! stored assignments are joined with catalog names from
//! `StaticRosterResolver` into a display-ready view.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Utc;
use muster_core::event::EventDraft;
use muster_core::ids::{GroupId, GuildId, ParticipantId, RoleId};
use muster_core::projection::build_roster_view;
use muster_core::service::{ClaimResult, EventService};
use muster_core::slot::Slot;
use muster_testing::{test_clock, InMemoryEventStore, StaticRosterResolver};
use std::sync::Arc;

fn resolver() -> StaticRosterResolver {
    StaticRosterResolver::new()
        .with_group(
            "gA",
            "Vanguard",
            vec![
                (RoleId::new("tank"), "Tank".to_string()),
                (RoleId::new("healer"), "Healer".to_string()),
            ],
        )
        .with_group(
            "gB",
            "Rearguard",
            vec![(RoleId::new("scout"), "Scout".to_string())],
        )
}

#[tokio::test]
async fn claims_show_up_in_the_roster_view() {
    let clock = Arc::new(test_clock());
    let store = Arc::new(InMemoryEventStore::with_clock(clock.clone()));
    let service = EventService::new(store, clock);

    let event = service
        .create_event(
            GuildId::new("guild-1"),
            "Testers".to_string(),
            EventDraft {
                scheduled_at: Utc::now(),
                title: "Raid night".to_string(),
                description: "Weekly clear".to_string(),
                created_by: ParticipantId::new("creator"),
                group_ids: vec![GroupId::new("gA"), GroupId::new("gB")],
                tags: vec![],
                location: None,
            },
        )
        .await
        .expect("Failed to create event");

    let claimed = service
        .claim_slot(event.uuid, ParticipantId::new("u1"), Slot::new(1, 2))
        .await
        .expect("Claim should not error");
    assert_eq!(claimed, ClaimResult::Claimed);

    let event = service
        .get_event(event.uuid)
        .await
        .expect("Failed to load event");
    let view = build_roster_view(&event, &resolver())
        .await
        .expect("View should build");

    assert_eq!(view.groups.len(), 2);

    let vanguard = &view.groups[0];
    assert_eq!(vanguard.position, 1);
    assert_eq!(vanguard.name.as_deref(), Some("Vanguard"));
    assert_eq!(vanguard.roles.len(), 2);
    assert!(vanguard.roles[0].holders.is_empty());
    assert_eq!(vanguard.roles[1].name.as_deref(), Some("Healer"));
    assert_eq!(vanguard.roles[1].holders, vec![ParticipantId::new("u1")]);

    let rearguard = &view.groups[1];
    assert_eq!(rearguard.position, 2);
    assert_eq!(rearguard.name.as_deref(), Some("Rearguard"));
    assert!(rearguard.roles.iter().all(|role| role.holders.is_empty()));
}

#[tokio::test]
async fn released_slots_leave_the_view_empty() {
    let clock = Arc::new(test_clock());
    let store = Arc::new(InMemoryEventStore::with_clock(clock.clone()));
    let service = EventService::new(store, clock);

    let event = service
        .create_event(
            GuildId::new("guild-1"),
            "Testers".to_string(),
            EventDraft {
                scheduled_at: Utc::now(),
                title: "Raid night".to_string(),
                description: "Weekly clear".to_string(),
                created_by: ParticipantId::new("creator"),
                group_ids: vec![GroupId::new("gA")],
                tags: vec![],
                location: None,
            },
        )
        .await
        .expect("Failed to create event");

    service
        .claim_slot(event.uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await
        .expect("Claim should not error");
    service
        .release_slot(event.uuid, ParticipantId::new("u1"))
        .await
        .expect("Failed to release");

    let event = service
        .get_event(event.uuid)
        .await
        .expect("Failed to load event");
    let view = build_roster_view(&event, &resolver())
        .await
        .expect("View should build");

    assert!(view.groups[0]
        .roles
        .iter()
        .all(|role| role.holders.is_empty()));
}
