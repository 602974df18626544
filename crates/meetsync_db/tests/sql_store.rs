use chrono::{DateTime, Duration, TimeZone, Utc};
use meetsync_common::models::{
    Booking, BookingStatus, Interval, Lead, Proposal, ProposalStatus, Slot, SlotSyncStatus,
};
use meetsync_common::{BookingFilter, ClaimOutcome, ClaimRequest, SlotTransition, Store, StoreError};
use meetsync_config::DatabaseConfig;
use meetsync_db::{DbClient, SqlStore};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

async fn store() -> SqlStore {
    // One connection: every connection to sqlite::memory: is its own database.
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let store = SqlStore::new(DbClient::from_config(&config).await.unwrap());
    store.init_schema().await.unwrap();
    store
}

#[tokio::test]
async fn mysql_urls_are_rejected() {
    let config = DatabaseConfig {
        url: "mysql://meetsync@localhost/meetsync".to_string(),
        max_connections: 1,
    };
    let err = DbClient::from_config(&config).await.unwrap_err();
    assert!(matches!(err, meetsync_db::DbError::UrlError(_)));
}

fn slot(hour: u32, capacity: u32) -> Slot {
    let start = Utc.with_ymd_and_hms(2025, 6, 3, hour, 0, 0).unwrap();
    let interval = Interval::new(start, start + Duration::hours(1)).unwrap();
    Slot::new("primary", interval, capacity, SlotSyncStatus::Pending, now())
}

fn proposal(token: &str, slot_ids: Vec<uuid::Uuid>) -> Proposal {
    Proposal {
        token: token.to_string(),
        lead_id: "lead-1".to_string(),
        slot_ids,
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
        booking: Booking::pending(slot.id, "lead-1", token, Some("intro".into()), now()),
        now: now(),
    }
}

#[tokio::test]
async fn slots_are_unique_per_calendar_and_interval() {
    let store = store().await;
    let first = slot(10, 1);
    let mut twin = slot(10, 1);
    twin.id = uuid::Uuid::new_v4();

    assert_eq!(store.insert_slot_if_absent(first.clone()).await.unwrap(), Some(first.clone()));
    assert_eq!(store.insert_slot_if_absent(twin).await.unwrap(), None);
    assert_eq!(store.get_slot(first.id).await.unwrap(), Some(first));
}

#[tokio::test]
async fn proposal_keeps_slot_order() {
    let store = store().await;
    let a = slot(10, 1);
    let b = slot(14, 1);
    store.insert_slot_if_absent(a.clone()).await.unwrap();
    store.insert_slot_if_absent(b.clone()).await.unwrap();
    store.insert_proposal(proposal("tok", vec![b.id, a.id])).await.unwrap();

    let loaded = store.get_proposal("tok").await.unwrap().unwrap();
    assert_eq!(loaded.slot_ids, vec![b.id, a.id]);
    assert_eq!(loaded.status, ProposalStatus::Active);
    assert!(matches!(
        store.insert_proposal(proposal("tok", vec![a.id])).await,
        Err(StoreError::Duplicate(_))
    ));

    let ordered = store.get_slots(&[b.id, a.id]).await.unwrap();
    assert_eq!(ordered.iter().map(|s| s.id).collect::<Vec<_>>(), vec![b.id, a.id]);
}

#[tokio::test]
async fn claim_confirm_and_cancel_keep_counts_consistent() {
    let store = store().await;
    let s = slot(10, 1);
    store.insert_slot_if_absent(s.clone()).await.unwrap();
    store.insert_proposal(proposal("tok-a", vec![s.id])).await.unwrap();
    store.insert_proposal(proposal("tok-b", vec![s.id])).await.unwrap();

    let ClaimOutcome::Claimed(booking) = store.claim_slot(claim("tok-a", &s)).await.unwrap() else {
        panic!("first claim should succeed");
    };
    assert_eq!(
        store.claim_slot(claim("tok-b", &s)).await.unwrap(),
        ClaimOutcome::SlotUnavailable
    );
    // tok-b was not consumed by the failed claim.
    assert_eq!(
        store.get_proposal("tok-b").await.unwrap().unwrap().status,
        ProposalStatus::Active
    );

    let confirmed = store
        .confirm_booking(booking.id, "evt-1".into(), Some("https://meet/x".into()), now())
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.join_link.as_deref(), Some("https://meet/x"));

    store.cancel_booking(booking.id, now()).await.unwrap();
    assert_eq!(store.get_slot(s.id).await.unwrap().unwrap().claimed_count, 0);
    assert!(matches!(
        store.claim_slot(claim("tok-b", &s)).await.unwrap(),
        ClaimOutcome::Claimed(_)
    ));
}

#[tokio::test]
async fn compensation_is_atomic_and_single_shot() {
    let store = store().await;
    let s = slot(10, 2);
    store.insert_slot_if_absent(s.clone()).await.unwrap();
    store.insert_proposal(proposal("tok-a", vec![s.id])).await.unwrap();

    let ClaimOutcome::Claimed(booking) = store.claim_slot(claim("tok-a", &s)).await.unwrap() else {
        panic!("claim should succeed");
    };
    let failed = store.compensate_booking(booking.id, now()).await.unwrap();
    assert_eq!(failed.status, BookingStatus::Failed);

    let proposal = store.get_proposal("tok-a").await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Active);
    assert_eq!(proposal.redeemed_at, None);
    assert_eq!(store.get_slot(s.id).await.unwrap().unwrap().claimed_count, 0);

    assert!(matches!(
        store.compensate_booking(booking.id, now()).await,
        Err(StoreError::InvalidState(_))
    ));
    assert!(matches!(
        store.compensate_booking(uuid::Uuid::new_v4(), now()).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn claim_rejects_slot_outside_proposal() {
    let store = store().await;
    let bound = slot(10, 1);
    let other = slot(14, 1);
    store.insert_slot_if_absent(bound.clone()).await.unwrap();
    store.insert_slot_if_absent(other.clone()).await.unwrap();
    store.insert_proposal(proposal("tok", vec![bound.id])).await.unwrap();

    assert_eq!(
        store.claim_slot(claim("tok", &other)).await.unwrap(),
        ClaimOutcome::TokenNotRedeemable
    );
    // The rolled-back claim left no capacity taken.
    assert_eq!(store.get_slot(other.id).await.unwrap().unwrap().claimed_count, 0);
}

#[tokio::test]
async fn transitions_and_listings() {
    let store = store().await;
    let s = slot(10, 1);
    store.insert_slot_if_absent(s.clone()).await.unwrap();

    let to_synced = SlotTransition {
        slot_id: s.id,
        from: vec![SlotSyncStatus::Pending, SlotSyncStatus::Error],
        to: SlotSyncStatus::Synced,
        remote_event_id: Some("ph-1".into()),
        synced_at: now(),
    };
    assert!(store.transition_slot(to_synced.clone()).await.unwrap());
    assert!(!store.transition_slot(to_synced).await.unwrap());

    let loaded = store.get_slot(s.id).await.unwrap().unwrap();
    assert_eq!(loaded.sync_status, SlotSyncStatus::Synced);
    assert_eq!(loaded.remote_event_id.as_deref(), Some("ph-1"));

    let cancel = SlotTransition {
        slot_id: s.id,
        from: vec![SlotSyncStatus::Synced],
        to: SlotSyncStatus::Cancelled,
        remote_event_id: None,
        synced_at: now(),
    };
    assert!(store.transition_slot(cancel).await.unwrap());
    assert!(store.list_reconcilable_slots(now()).await.unwrap().is_empty());
    assert_eq!(
        store.list_slots(now(), now() + Duration::days(2)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn stale_bookings_and_filters() {
    let store = store().await;
    let s = slot(10, 2);
    store.insert_slot_if_absent(s.clone()).await.unwrap();
    store.insert_proposal(proposal("tok-a", vec![s.id])).await.unwrap();
    store.claim_slot(claim("tok-a", &s)).await.unwrap();

    let stale = store
        .list_stale_bookings(now() + Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(stale.len(), 1);
    assert!(store.list_stale_bookings(now()).await.unwrap().is_empty());

    let pending = BookingFilter {
        status: Some(BookingStatus::Pending),
        slot_id: Some(s.id),
    };
    assert_eq!(store.list_bookings(pending).await.unwrap().len(), 1);
    let confirmed = BookingFilter {
        status: Some(BookingStatus::Confirmed),
        slot_id: None,
    };
    assert!(store.list_bookings(confirmed).await.unwrap().is_empty());
}

#[tokio::test]
async fn leads_upsert_by_id() {
    let store = store().await;
    let mut lead = Lead {
        id: "lead-1".into(),
        contact_name: "Kim".into(),
        email: "kim@example.com".into(),
        company_name: None,
        phone: None,
    };
    store.upsert_lead(lead.clone()).await.unwrap();
    lead.company_name = Some("Acme".into());
    store.upsert_lead(lead.clone()).await.unwrap();

    assert_eq!(store.find_lead("lead-1").await.unwrap(), Some(lead));
    assert_eq!(store.find_lead("nobody").await.unwrap(), None);
}
