// --- File: crates/meetsync_common/src/store/memory_test.rs ---
use super::memory::MemoryStore;
use super::{BookingFilter, ClaimOutcome, ClaimRequest, SlotTransition, Store, StoreError};
use crate::models::{
    Booking, BookingStatus, CalendarSyncStatus, Interval, Proposal, ProposalStatus, Slot,
    SlotSyncStatus,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

fn slot_at(hour: u32, capacity: u32) -> Slot {
    let start = Utc.with_ymd_and_hms(2025, 6, 3, hour, 0, 0).unwrap();
    let interval = Interval::new(start, start + Duration::hours(1)).unwrap();
    Slot::new("primary", interval, capacity, SlotSyncStatus::Synced, now())
}

fn proposal(token: &str, slot: &Slot) -> Proposal {
    Proposal {
        token: token.to_string(),
        lead_id: "lead-1".to_string(),
        slot_ids: vec![slot.id],
        issued_at: now(),
        expires_at: now() + Duration::days(7),
        redeemed_at: None,
        status: ProposalStatus::Active,
    }
}

fn claim(token: &str, slot: &Slot) -> ClaimRequest {
    ClaimRequest {
        token: token.to_string(),
        slot_id: slot.id,
        booking: Booking::pending(slot.id, "lead-1", token, None, now()),
        now: now(),
    }
}

async fn seeded(capacity: u32, tokens: &[&str]) -> (MemoryStore, Slot) {
    let store = MemoryStore::new();
    let slot = slot_at(10, capacity);
    store.insert_slot_if_absent(slot.clone()).await.unwrap();
    for token in tokens {
        store.insert_proposal(proposal(token, &slot)).await.unwrap();
    }
    (store, slot)
}

#[tokio::test]
async fn duplicate_slots_are_skipped() {
    let store = MemoryStore::new();
    let first = slot_at(10, 1);
    let mut twin = slot_at(10, 1);
    twin.id = uuid::Uuid::new_v4();

    assert!(store.insert_slot_if_absent(first).await.unwrap().is_some());
    assert!(store.insert_slot_if_absent(twin).await.unwrap().is_none());
    let all = store
        .list_slots(now(), now() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn claim_redeems_token_and_counts_capacity() {
    let (store, slot) = seeded(1, &["tok-a"]).await;

    let outcome = store.claim_slot(claim("tok-a", &slot)).await.unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed(_)));

    let slot = store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(slot.claimed_count, 1);
    let proposal = store.get_proposal("tok-a").await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Redeemed);
    assert_eq!(proposal.redeemed_at, Some(now()));
}

#[tokio::test]
async fn second_claim_with_same_token_writes_nothing() {
    let (store, slot) = seeded(2, &["tok-a"]).await;

    store.claim_slot(claim("tok-a", &slot)).await.unwrap();
    let again = store.claim_slot(claim("tok-a", &slot)).await.unwrap();

    assert_eq!(again, ClaimOutcome::TokenNotRedeemable);
    assert_eq!(store.get_slot(slot.id).await.unwrap().unwrap().claimed_count, 1);
    assert_eq!(store.list_bookings(BookingFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_claims_never_exceed_capacity() {
    let tokens: Vec<String> = (0..16).map(|i| format!("tok-{i}")).collect();
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let (store, slot) = seeded(3, &refs).await;
    let store = Arc::new(store);

    let handles: Vec<_> = tokens
        .iter()
        .map(|token| {
            let store = store.clone();
            let request = claim(token, &slot);
            tokio::spawn(async move { store.claim_slot(request).await.unwrap() })
        })
        .collect();

    let mut claimed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ClaimOutcome::Claimed(_) => claimed += 1,
            ClaimOutcome::SlotUnavailable => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(claimed, 3);
    assert_eq!(store.get_slot(slot.id).await.unwrap().unwrap().claimed_count, 3);
    assert_eq!(store.active_claims(slot.id).await, 3);
}

#[tokio::test]
async fn expired_token_cannot_claim() {
    let store = MemoryStore::new();
    let slot = slot_at(10, 1);
    store.insert_slot_if_absent(slot.clone()).await.unwrap();
    let mut short = proposal("tok-a", &slot);
    short.expires_at = now() + Duration::hours(1);
    store.insert_proposal(short).await.unwrap();

    let mut request = claim("tok-a", &slot);
    request.now = now() + Duration::hours(2);
    assert_eq!(
        store.claim_slot(request).await.unwrap(),
        ClaimOutcome::TokenNotRedeemable
    );
    assert_eq!(store.get_slot(slot.id).await.unwrap().unwrap().claimed_count, 0);
}

#[tokio::test]
async fn compensation_restores_token_and_capacity() {
    let (store, slot) = seeded(1, &["tok-a"]).await;
    let ClaimOutcome::Claimed(booking) = store.claim_slot(claim("tok-a", &slot)).await.unwrap()
    else {
        panic!("claim should succeed");
    };

    let failed = store.compensate_booking(booking.id, now()).await.unwrap();
    assert_eq!(failed.status, BookingStatus::Failed);
    assert_eq!(failed.calendar_sync_status, CalendarSyncStatus::Error);

    let slot_after = store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(slot_after.claimed_count, 0);
    assert_eq!(slot_after.sync_status, SlotSyncStatus::Synced);
    let proposal = store.get_proposal("tok-a").await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Active);
    assert_eq!(proposal.redeemed_at, None);

    // Compensating twice is refused.
    assert!(matches!(
        store.compensate_booking(booking.id, now()).await,
        Err(StoreError::InvalidState(_))
    ));
}

#[tokio::test]
async fn cancelling_confirmed_booking_releases_capacity() {
    let (store, slot) = seeded(1, &["tok-a"]).await;
    let ClaimOutcome::Claimed(booking) = store.claim_slot(claim("tok-a", &slot)).await.unwrap()
    else {
        panic!("claim should succeed");
    };
    assert!(store.cancel_booking(booking.id, now()).await.is_err());

    store
        .confirm_booking(booking.id, "evt-1".into(), None, now())
        .await
        .unwrap();
    let cancelled = store.cancel_booking(booking.id, now()).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(store.get_slot(slot.id).await.unwrap().unwrap().claimed_count, 0);
    // The token stays redeemed.
    let proposal = store.get_proposal("tok-a").await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Redeemed);
}

#[tokio::test]
async fn transition_is_compare_and_swap() {
    let (store, slot) = seeded(1, &[]).await;
    let busy = SlotTransition {
        slot_id: slot.id,
        from: vec![SlotSyncStatus::Pending],
        to: SlotSyncStatus::Busy,
        remote_event_id: None,
        synced_at: now(),
    };
    assert!(!store.transition_slot(busy.clone()).await.unwrap());

    let busy = SlotTransition {
        from: vec![SlotSyncStatus::Synced],
        ..busy
    };
    assert!(store.transition_slot(busy).await.unwrap());
    let slot = store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(slot.sync_status, SlotSyncStatus::Busy);
    assert_eq!(slot.last_synced_at, Some(now()));
}

#[tokio::test]
async fn only_active_tokens_can_be_revoked() {
    let (store, slot) = seeded(1, &["tok-a"]).await;
    assert!(store.revoke_proposal("tok-a", now()).await.unwrap());
    assert!(!store.revoke_proposal("tok-a", now()).await.unwrap());
    assert!(!store.revoke_proposal("missing", now()).await.unwrap());
    assert_eq!(
        store.claim_slot(claim("tok-a", &slot)).await.unwrap(),
        ClaimOutcome::TokenNotRedeemable
    );
}
