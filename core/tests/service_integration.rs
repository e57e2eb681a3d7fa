//! Service-level scenarios over the in-memory event store.
//!
//! These exercise the full claim path (validation, token encoding, atomic
//! claim, retry policy) without a database, using the test doubles from
//! `muster-testing`.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages
#![allow(clippy::unwrap_used)]

use chrono::Utc;
use muster_core::environment::Clock;
use muster_core::event::EventDraft;
use muster_core::ids::{EventUuid, GroupId, GuildId, ParticipantId};
use muster_core::service::{ClaimResult, EventService, ServiceError};
use muster_core::slot::Slot;
use muster_testing::mocks::{test_clock, InMemoryEventStore};
use std::sync::Arc;

fn service_with_store() -> (EventService, Arc<InMemoryEventStore>) {
    let clock = Arc::new(test_clock());
    let store = Arc::new(InMemoryEventStore::with_clock(clock.clone()));
    let service = EventService::new(store.clone(), clock);
    (service, store)
}

fn draft(group_ids: Vec<&str>) -> EventDraft {
    EventDraft {
        scheduled_at: Utc::now(),
        title: "Raid night".to_string(),
        description: "Weekly clear".to_string(),
        created_by: ParticipantId::new("creator"),
        group_ids: group_ids.into_iter().map(GroupId::new).collect(),
        tags: vec!["pve".to_string()],
        location: None,
    }
}

async fn create(service: &EventService, group_ids: Vec<&str>) -> EventUuid {
    service
        .create_event(GuildId::new("guild-1"), "Testers".to_string(), draft(group_ids))
        .await
        .expect("Failed to create event")
        .uuid
}

#[tokio::test]
async fn test_create_event_preserves_group_order() {
    let (service, _store) = service_with_store();

    let uuid = create(&service, vec!["tanks", "healers", "dps"]).await;
    let event = service.get_event(uuid).await.expect("Failed to load event");

    assert_eq!(
        event.group_ids,
        vec![
            GroupId::new("tanks"),
            GroupId::new("healers"),
            GroupId::new("dps")
        ]
    );
    assert!(event.assignments.is_empty());
    assert_eq!(event.created_at, test_clock().now());
}

#[tokio::test]
async fn test_create_event_rejects_bad_group_counts() {
    let (service, _store) = service_with_store();

    for groups in [vec![], vec!["a", "b", "c", "d", "e"]] {
        let result = service
            .create_event(GuildId::new("guild-1"), "Testers".to_string(), draft(groups))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    for n in 1..=4usize {
        let groups: Vec<String> = (0..n).map(|i| format!("g{i}")).collect();
        let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
        assert!(
            service
                .create_event(GuildId::new("guild-1"), "Testers".to_string(), draft(groups))
                .await
                .is_ok(),
            "{n} groups should be accepted"
        );
    }
}

#[tokio::test]
async fn test_multi_group_claim_scenario() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA", "gB"]).await;
    let slot = Slot::new(1, 2);

    let first = service
        .claim_slot(uuid, ParticipantId::new("u1"), slot)
        .await
        .expect("Claim should not error");
    assert_eq!(first, ClaimResult::Claimed);

    let event = service.get_event(uuid).await.expect("Failed to load event");
    let token = event
        .token_for(&ParticipantId::new("u1"))
        .expect("u1 should hold a token");
    assert_eq!(token.as_str(), "1.2");

    let second = service
        .claim_slot(uuid, ParticipantId::new("u2"), slot)
        .await
        .expect("Claim should not error");
    assert_eq!(second, ClaimResult::SlotTaken);

    service
        .release_slot(uuid, ParticipantId::new("u1"))
        .await
        .expect("Failed to release");

    let third = service
        .claim_slot(uuid, ParticipantId::new("u2"), slot)
        .await
        .expect("Claim should not error");
    assert_eq!(third, ClaimResult::Claimed);
}

#[tokio::test]
async fn test_single_group_claim_uses_bare_token() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA"]).await;

    let result = service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 3))
        .await
        .expect("Claim should not error");
    assert_eq!(result, ClaimResult::Claimed);

    let event = service.get_event(uuid).await.expect("Failed to load event");
    let token = event
        .token_for(&ParticipantId::new("u1"))
        .expect("u1 should hold a token");
    assert_eq!(token.as_str(), "3");
}

#[tokio::test]
async fn test_claim_rejects_out_of_range_slots() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA", "gB"]).await;

    for slot in [Slot::new(0, 1), Slot::new(3, 1), Slot::new(1, 0)] {
        let result = service
            .claim_slot(uuid, ParticipantId::new("u1"), slot)
            .await;
        assert!(
            matches!(result, Err(ServiceError::Validation(_))),
            "slot {slot} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_claim_on_unknown_event_is_not_found() {
    let (service, _store) = service_with_store();

    let result = service
        .claim_slot(EventUuid::new(), ParticipantId::new("u1"), Slot::new(1, 1))
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_claims_exactly_one_winner() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA", "gB"]).await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .claim_slot(uuid, ParticipantId::new(format!("u{i}")), Slot::new(2, 1))
                .await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.expect("Task panicked").expect("Claim errored") {
            ClaimResult::Claimed => winners += 1,
            ClaimResult::SlotTaken => {}
        }
    }

    assert_eq!(winners, 1, "Exactly one concurrent claim should succeed");

    let event = service.get_event(uuid).await.expect("Failed to load event");
    assert_eq!(event.assignments.len(), 1);
}

#[tokio::test]
async fn test_claim_moves_participant_to_new_slot() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA", "gB"]).await;

    service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await
        .expect("Claim should not error");
    let moved = service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(2, 1))
        .await
        .expect("Claim should not error");
    assert_eq!(moved, ClaimResult::Claimed);

    // One entry per participant: the move freed the old slot.
    let event = service.get_event(uuid).await.expect("Failed to load event");
    assert_eq!(event.assignments.len(), 1);
    assert_eq!(
        event
            .token_for(&ParticipantId::new("u1"))
            .map(|token| token.as_str()),
        Some("2.1")
    );

    let reclaimed = service
        .claim_slot(uuid, ParticipantId::new("u2"), Slot::new(1, 1))
        .await
        .expect("Claim should not error");
    assert_eq!(reclaimed, ClaimResult::Claimed);
}

#[tokio::test]
async fn test_failed_move_keeps_existing_slot() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA", "gB"]).await;

    service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await
        .expect("Claim should not error");
    service
        .claim_slot(uuid, ParticipantId::new("u2"), Slot::new(2, 1))
        .await
        .expect("Claim should not error");

    // u1 loses the move onto u2's slot and keeps their old one.
    let moved = service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(2, 1))
        .await
        .expect("Claim should not error");
    assert_eq!(moved, ClaimResult::SlotTaken);

    let event = service.get_event(uuid).await.expect("Failed to load event");
    assert_eq!(
        event
            .token_for(&ParticipantId::new("u1"))
            .map(|token| token.as_str()),
        Some("1.1")
    );
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let (service, _store) = service_with_store();
    let uuid = create(&service, vec!["gA"]).await;

    service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await
        .expect("Claim should not error");

    service
        .release_slot(uuid, ParticipantId::new("u1"))
        .await
        .expect("First release should succeed");
    service
        .release_slot(uuid, ParticipantId::new("u1"))
        .await
        .expect("Repeated release should succeed");

    let event = service.get_event(uuid).await.expect("Failed to load event");
    assert!(event.assignments.is_empty());
}

#[tokio::test]
async fn test_release_on_unknown_event_is_a_noop() {
    let (service, _store) = service_with_store();

    // Release always succeeds, even against an event that does not exist.
    service
        .release_slot(EventUuid::new(), ParticipantId::new("u1"))
        .await
        .expect("Release on a missing event should succeed");
}

#[tokio::test]
async fn test_claim_retries_past_transient_conflicts() {
    let (service, store) = service_with_store();
    let uuid = create(&service, vec!["gA"]).await;

    // Two injected conflicts fit inside the three-attempt budget.
    store.inject_conflicts(2);

    let result = service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await
        .expect("Claim should recover from transient conflicts");
    assert_eq!(result, ClaimResult::Claimed);
}

#[tokio::test]
async fn test_claim_gives_up_after_retry_budget() {
    let (service, store) = service_with_store();
    let uuid = create(&service, vec!["gA"]).await;

    store.inject_conflicts(5);

    let result = service
        .claim_slot(uuid, ParticipantId::new("u1"), Slot::new(1, 1))
        .await;
    assert!(matches!(result, Err(ServiceError::Transient(_))));
}
