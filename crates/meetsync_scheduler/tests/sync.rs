
use chrono::{Duration, Utc};
use fixtures::{day_start, Harness, LEAD_ID};
use meetsync_common::models::{Booking, BookingStatus, ProposalStatus, SlotSyncStatus};
use meetsync_common::{ClaimOutcome, ClaimRequest, EventKind, Store};
use meetsync_scheduler::MeetingError;

#[tokio::test]
async fn generation_is_idempotent() {
    let h = Harness::new().await;
    let (from, to) = (day_start(2), day_start(4));

    let first = h.generator.generate(from, to, Utc::now()).await.unwrap();
    assert_eq!(first.created, 6);
    assert!(!first.degraded);

    let second = h.generator.generate(from, to, Utc::now()).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 6);
    assert_eq!(h.store.list_slots(from, to).await.unwrap().len(), 6);
}

#[tokio::test]
async fn generation_marks_intervals_under_busy_blocks() {
    let h = Harness::new().await;
    let from = day_start(2);
    let busy_start = from + Duration::minutes(9 * 60 + 30);
    h.calendar.set_busy(vec![meetsync_common::models::Interval::new(
        busy_start,
        busy_start + Duration::hours(1),
    )
    .unwrap()]);

    let report = h
        .generator
        .generate(from, from + Duration::days(1), Utc::now())
        .await
        .unwrap();

    assert_eq!(report.created, 3);
    assert_eq!(report.created_busy, 2);
    let statuses: Vec<_> = h
        .store
        .list_slots(from, from + Duration::days(1))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.sync_status)
        .collect();
    assert_eq!(
        statuses,
        vec![SlotSyncStatus::Busy, SlotSyncStatus::Busy, SlotSyncStatus::Pending]
    );
}

#[tokio::test(start_paused = true)]
async fn generation_degrades_when_free_busy_is_down() {
    let h = Harness::new().await;
    h.calendar.fail_next_free_busy(3);
    let from = day_start(2);

    let report = h
        .generator
        .generate(from, from + Duration::days(1), Utc::now())
        .await
        .unwrap();

    assert!(report.degraded);
    assert_eq!(report.created, 3);
    assert_eq!(report.created_busy, 0);
}

#[tokio::test]
async fn reconciliation_syncs_pending_slots_with_transparent_placeholders() {
    let h = Harness::new().await;
    let slot = h.slot(30, 1).await;

    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.synced, 1);
    let synced = h.reload(&slot).await;
    assert_eq!(synced.sync_status, SlotSyncStatus::Synced);
    assert!(synced.last_synced_at.is_some());
    let created = h.calendar.created();
    assert_eq!(created.len(), 1);
    assert_eq!(synced.remote_event_id.as_deref(), Some(created[0].0.as_str()));
    assert_eq!(created[0].1.kind, EventKind::Placeholder);
    assert!(created[0].1.attendees.is_empty());

    // A second pass finds nothing to do.
    let again = h.synchronizer.reconcile(Utc::now()).await.unwrap();
    assert_eq!(again.synced, 0);
    assert_eq!(h.calendar.created().len(), 1);
}

#[tokio::test]
async fn external_conflict_marks_slot_busy_but_keeps_the_booking() {
    let h = Harness::new().await;
    let free = h.slot(30, 1).await;
    let booked = h.slot(40, 2).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let token = h.token_for(&[&booked]).await;
    let booking = h.bookings.book(&token, booked.id, None).await.unwrap();

    // Someone else books over both slots upstream.
    let conflict = meetsync_common::models::Interval::new(
        free.start_time,
        booked.end_time,
    )
    .unwrap();
    h.calendar.set_busy(vec![conflict]);
    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.busy, 2);
    let free = h.reload(&free).await;
    assert_eq!(free.sync_status, SlotSyncStatus::Busy);
    assert_eq!(free.remote_event_id, None);
    let booked = h.reload(&booked).await;
    assert_eq!(booked.sync_status, SlotSyncStatus::Busy);
    assert_eq!(booked.claimed_count, 1);
    let booking = h.bookings.get_booking(booking.id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    // BUSY blocks further claims even with capacity left.
    let err = h.proposals.issue(LEAD_ID, &[booked.id], Duration::days(1)).await.unwrap_err();
    assert!(matches!(err, MeetingError::InvalidSlotSet(_)));
}

#[tokio::test]
async fn our_own_booking_event_is_not_a_conflict() {
    let h = Harness::new().await;
    let slot = h.slot(30, 2).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let token = h.token_for(&[&slot]).await;
    h.bookings.book(&token, slot.id, None).await.unwrap();

    h.calendar.set_busy(vec![slot.interval()]);
    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.busy, 0);
    assert_eq!(h.reload(&slot).await.sync_status, SlotSyncStatus::Synced);
}

#[tokio::test]
async fn back_to_back_bookings_merged_by_free_busy_are_not_conflicts() {
    let h = Harness::new().await;
    let first = h.slot(30, 1).await;
    let second = h.slot(31, 1).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let token = h.token_for(&[&first]).await;
    let first_booking = h.bookings.book(&token, first.id, None).await.unwrap();
    let token = h.token_for(&[&second]).await;
    h.bookings.book(&token, second.id, None).await.unwrap();

    // The provider reports both booking events as one block.
    h.calendar.set_busy(vec![meetsync_common::models::Interval::new(
        first.start_time,
        second.end_time,
    )
    .unwrap()]);
    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.busy, 0);
    assert_eq!(h.reload(&first).await.sync_status, SlotSyncStatus::Synced);
    assert_eq!(h.reload(&second).await.sync_status, SlotSyncStatus::Synced);

    // Cancelling a booking makes its slot bookable again.
    h.bookings.cancel_booking(first_booking.id).await.unwrap();
    let first = h.reload(&first).await;
    assert_eq!(first.claimed_count, 0);
    assert!(first.is_claimable(Utc::now()));
    h.proposals
        .issue(LEAD_ID, &[first.id], Duration::days(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn placeholder_deleted_upstream_cancels_the_slot() {
    let h = Harness::new().await;
    let slot = h.slot(30, 1).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let placeholder = h.reload(&slot).await.remote_event_id.unwrap();

    h.calendar.delete_upstream(&placeholder);
    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.cancelled, 1);
    let slot = h.reload(&slot).await;
    assert_eq!(slot.sync_status, SlotSyncStatus::Cancelled);
    assert_eq!(slot.remote_event_id, None);
}

#[tokio::test(start_paused = true)]
async fn provider_outage_moves_slots_to_error_until_the_next_good_pass() {
    let h = Harness::new().await;
    let pending = h.slot(30, 1).await;
    let busy = h.slot(32, 1).await;
    h.store.force_slot_status(busy.id, SlotSyncStatus::Busy).await;
    h.calendar.fail_next_free_busy(3);

    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();

    assert_eq!(report.errored, 1);
    assert_eq!(h.reload(&pending).await.sync_status, SlotSyncStatus::Error);
    // Failures never loosen BUSY.
    assert_eq!(h.reload(&busy).await.sync_status, SlotSyncStatus::Busy);

    let report = h.synchronizer.reconcile(Utc::now()).await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(h.reload(&pending).await.sync_status, SlotSyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn an_outage_removes_the_placeholder_before_a_new_one_is_created() {
    let h = Harness::new().await;
    let slot = h.slot(30, 1).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let first = h.reload(&slot).await.remote_event_id.unwrap();

    h.calendar.fail_next_free_busy(3);
    h.synchronizer.reconcile(Utc::now()).await.unwrap();

    let errored = h.reload(&slot).await;
    assert_eq!(errored.sync_status, SlotSyncStatus::Error);
    assert_eq!(errored.remote_event_id, None);
    assert_eq!(h.calendar.cancelled(), vec![first.clone()]);

    h.synchronizer.reconcile(Utc::now()).await.unwrap();

    let resynced = h.reload(&slot).await;
    assert_eq!(resynced.sync_status, SlotSyncStatus::Synced);
    let second = resynced.remote_event_id.unwrap();
    assert_ne!(second, first);
    assert_eq!(h.calendar.created().len(), 2);
    // Only the superseded placeholder was removed.
    assert_eq!(h.calendar.cancelled(), vec![first]);
}

#[tokio::test]
async fn admin_can_cancel_a_slot_once() {
    let h = Harness::new().await;
    let slot = h.slot(30, 1).await;
    h.synchronizer.reconcile(Utc::now()).await.unwrap();
    let placeholder = h.reload(&slot).await.remote_event_id.unwrap();

    let cancelled = h.synchronizer.cancel_slot(slot.id, Utc::now()).await.unwrap();

    assert_eq!(cancelled.sync_status, SlotSyncStatus::Cancelled);
    assert_eq!(h.calendar.cancelled(), vec![placeholder]);
    let err = h.synchronizer.cancel_slot(slot.id, Utc::now()).await.unwrap_err();
    assert!(matches!(err, MeetingError::InvalidTransition(_)));
    let err = h
        .synchronizer
        .cancel_slot(uuid::Uuid::new_v4(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, MeetingError::SlotNotFound(_)));
}

#[tokio::test]
async fn stale_pending_bookings_are_compensated() {
    let h = Harness::new().await;
    let slot = h.slot(30, 1).await;
    let token = h.token_for(&[&slot]).await;

    // A claim whose process died before the calendar call.
    let an_hour_ago = Utc::now() - Duration::hours(1);
    let outcome = h
        .store
        .claim_slot(ClaimRequest {
            token: token.clone(),
            slot_id: slot.id,
            booking: Booking::pending(slot.id, LEAD_ID, &token, None, an_hour_ago),
            now: an_hour_ago,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed(_)));
    assert_eq!(h.reload(&slot).await.claimed_count, 1);

    let recovered = h.synchronizer.recover_stale_bookings(Utc::now()).await.unwrap();

    assert_eq!(recovered, 1);
    assert_eq!(h.reload(&slot).await.claimed_count, 0);
    let proposal = h.store.get_proposal(&token).await.unwrap().unwrap();
    assert_eq!(proposal.status, ProposalStatus::Active);
    assert_eq!(h.synchronizer.recover_stale_bookings(Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn a_full_pass_generates_and_syncs() {
    let h = Harness::new().await;

    let report = h.synchronizer.run_pass(Utc::now()).await.unwrap();

    let generation = report.generation.unwrap();
    assert!(generation.created > 0);
    assert_eq!(report.examined, generation.created);
    assert_eq!(report.synced, report.examined);
    assert_eq!(report.recovered_bookings, 0);
}
