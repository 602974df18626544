// --- File: crates/meetsync_scheduler/src/synchronizer.rs ---
//! Background reconciliation of slot state against the remote calendar.
//!
//! Slot state machine:
//!
//! ```text
//! PENDING --free, placeholder created--> SYNCED
//! PENDING/SYNCED/ERROR --external conflict--> BUSY
//! PENDING/SYNCED --provider failure--> ERROR
//! ERROR --free, placeholder created--> SYNCED
//! SYNCED --placeholder gone--> CANCELLED
//! any non-terminal --admin--> CANCELLED
//! ```
//!
//! Every write is a compare-and-swap on the status the pass read, so a pass
//! that raced with a booking or an admin action simply loses. Claim counts
//! are never touched here.

use chrono::{DateTime, Duration, Utc};
use meetsync_common::models::{BusyInterval, Interval, Slot, SlotSyncStatus};
use meetsync_common::{
    CalendarProvider, EventKind, NewCalendarEvent, RemoteEventStatus, RetryPolicy, SlotTransition,
    Store,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::MeetingError;
use crate::slot_generator::{GenerationReport, SlotGenerator};

const PLACEHOLDER_SUMMARY: &str = "Open meeting slot";

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub generation: Option<GenerationReport>,
    pub examined: usize,
    pub synced: usize,
    pub busy: usize,
    pub errored: usize,
    pub cancelled: usize,
    pub recovered_bookings: usize,
}

pub struct CalendarSynchronizer {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
    generator: Arc<SlotGenerator>,
    retry: RetryPolicy,
    stale_after: Duration,
}

impl CalendarSynchronizer {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        generator: Arc<SlotGenerator>,
        retry: RetryPolicy,
        stale_booking_minutes: i64,
    ) -> Self {
        Self {
            store,
            provider,
            generator,
            retry,
            stale_after: Duration::minutes(stale_booking_minutes.max(1)),
        }
    }

    fn calendar_id(&self) -> &str {
        self.generator.calendar_id()
    }

    /// One reconciliation pass over every future, non-cancelled slot.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<SyncReport, MeetingError> {
        let slots = self.store.list_reconcilable_slots(now).await?;
        let mut report = SyncReport {
            examined: slots.len(),
            ..SyncReport::default()
        };
        let (Some(first), Some(last)) = (slots.first(), slots.iter().map(|s| s.end_time).max())
        else {
            return Ok(report);
        };
        let Some(window) = Interval::new(first.start_time, last) else {
            return Ok(report);
        };

        let busy = self
            .retry
            .run("query_free_busy", || {
                self.provider.query_free_busy(self.calendar_id(), window)
            })
            .await;

        let busy = match busy {
            Ok(busy) => busy,
            Err(e) => {
                error!(error = %e, "Reconciliation could not read free/busy");
                for slot in &slots {
                    if self.mark_error(slot, now).await? {
                        report.errored += 1;
                    }
                }
                return Ok(report);
            }
        };

        let booked = self.booked_intervals(window, &busy).await?;
        for slot in &slots {
            self.reconcile_slot(slot, &busy, &booked, now, &mut report).await?;
        }

        info!(
            examined = report.examined,
            synced = report.synced,
            busy = report.busy,
            errored = report.errored,
            cancelled = report.cancelled,
            "Reconciliation pass finished"
        );
        Ok(report)
    }

    /// Intervals of this calendar's slots holding live bookings, covering
    /// every busy block. Free/busy merges adjacent events, so these are cut
    /// out of the blocks before looking for external conflicts.
    async fn booked_intervals(
        &self,
        window: Interval,
        busy: &[BusyInterval],
    ) -> Result<Vec<(Uuid, Interval)>, MeetingError> {
        let from = busy
            .iter()
            .map(|b| b.start)
            .min()
            .map_or(window.start, |start| start.min(window.start));
        let to = busy
            .iter()
            .map(|b| b.end)
            .max()
            .map_or(window.end, |end| end.max(window.end));
        Ok(self
            .store
            .list_slots(from, to)
            .await?
            .into_iter()
            .filter(|s| s.owner_calendar_id == self.calendar_id() && s.claimed_count > 0)
            .map(|s| (s.id, s.interval()))
            .collect())
    }

    async fn reconcile_slot(
        &self,
        slot: &Slot,
        busy: &[BusyInterval],
        booked: &[(Uuid, Interval)],
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Result<(), MeetingError> {
        let interval = slot.interval();
        let neighbours: Vec<Interval> = booked
            .iter()
            .filter(|(id, _)| *id != slot.id)
            .map(|(_, other)| *other)
            .collect();
        // What is left of a block once the neighbours' booking events are
        // removed; our own booking event covers exactly the slot interval.
        let conflict = busy
            .iter()
            .flat_map(|b| subtract(*b, &neighbours))
            .any(|b| b.overlaps(&interval) && !(slot.claimed_count > 0 && b == interval));

        match slot.sync_status {
            SlotSyncStatus::Busy | SlotSyncStatus::Cancelled => {}
            status if conflict => {
                if self
                    .transition(slot, &[status], SlotSyncStatus::Busy, None, now)
                    .await?
                {
                    info!(slot_id = %slot.id, from = %status, "Slot marked BUSY by external conflict");
                    report.busy += 1;
                    if let Some(placeholder) = &slot.remote_event_id {
                        self.cancel_remote(placeholder).await;
                    }
                }
            }
            SlotSyncStatus::Synced => match &slot.remote_event_id {
                Some(placeholder) => {
                    if self.check_placeholder(slot, placeholder, now).await? {
                        report.cancelled += 1;
                    }
                }
                None => {
                    if self.create_placeholder(slot, now, report).await? {
                        report.synced += 1;
                    }
                }
            },
            SlotSyncStatus::Pending | SlotSyncStatus::Error => {
                if self.create_placeholder(slot, now, report).await? {
                    report.synced += 1;
                }
            }
        }
        Ok(())
    }

    /// SYNCED slots whose placeholder disappeared upstream become CANCELLED.
    async fn check_placeholder(
        &self,
        slot: &Slot,
        placeholder: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MeetingError> {
        let status = self
            .retry
            .run("get_event_status", || {
                self.provider.get_event_status(self.calendar_id(), placeholder)
            })
            .await;
        match status {
            Ok(None) | Ok(Some(RemoteEventStatus::Cancelled)) => {
                let cancelled = self
                    .transition(
                        slot,
                        &[SlotSyncStatus::Synced],
                        SlotSyncStatus::Cancelled,
                        None,
                        now,
                    )
                    .await?;
                if cancelled {
                    info!(slot_id = %slot.id, "Placeholder removed upstream, slot CANCELLED");
                }
                Ok(cancelled)
            }
            Ok(Some(_)) => Ok(false),
            Err(e) => {
                warn!(slot_id = %slot.id, error = %e, "Placeholder check failed");
                self.mark_error(slot, now).await?;
                Ok(false)
            }
        }
    }

    /// Creates the transparent placeholder and moves the slot to SYNCED.
    async fn create_placeholder(
        &self,
        slot: &Slot,
        now: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Result<bool, MeetingError> {
        let event = NewCalendarEvent {
            summary: PLACEHOLDER_SUMMARY.to_string(),
            description: Some(format!("meetsync slot {}", slot.id)),
            interval: slot.interval(),
            attendees: Vec::new(),
            kind: EventKind::Placeholder,
        };
        let created = self
            .retry
            .run("create_placeholder", || {
                self.provider.create_event(self.calendar_id(), event.clone())
            })
            .await;

        match created {
            Ok(created) => {
                let applied = self
                    .transition(
                        slot,
                        &[slot.sync_status],
                        SlotSyncStatus::Synced,
                        Some(created.remote_event_id.clone()),
                        now,
                    )
                    .await?;
                if !applied {
                    debug!(slot_id = %slot.id, "Slot changed during sync, dropping placeholder");
                    self.cancel_remote(&created.remote_event_id).await;
                }
                Ok(applied)
            }
            Err(e) => {
                warn!(slot_id = %slot.id, error = %e, "Placeholder creation failed");
                if self.mark_error(slot, now).await? {
                    report.errored += 1;
                }
                Ok(false)
            }
        }
    }

    /// PENDING/SYNCED -> ERROR. BUSY and CANCELLED are never loosened.
    ///
    /// The placeholder of a SYNCED slot is removed upstream, since the next
    /// good pass creates a fresh one.
    async fn mark_error(&self, slot: &Slot, now: DateTime<Utc>) -> Result<bool, MeetingError> {
        if !matches!(
            slot.sync_status,
            SlotSyncStatus::Pending | SlotSyncStatus::Synced
        ) {
            return Ok(false);
        }
        let applied = self
            .transition(slot, &[slot.sync_status], SlotSyncStatus::Error, None, now)
            .await?;
        if applied {
            warn!(slot_id = %slot.id, from = %slot.sync_status, "Slot moved to ERROR");
            if let Some(placeholder) = &slot.remote_event_id {
                self.cancel_remote(placeholder).await;
            }
        }
        Ok(applied)
    }

    async fn transition(
        &self,
        slot: &Slot,
        from: &[SlotSyncStatus],
        to: SlotSyncStatus,
        remote_event_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<bool, MeetingError> {
        Ok(self
            .store
            .transition_slot(SlotTransition {
                slot_id: slot.id,
                from: from.to_vec(),
                to,
                remote_event_id,
                synced_at: now,
            })
            .await?)
    }

    /// Best-effort removal of a remote event.
    async fn cancel_remote(&self, remote_event_id: &str) {
        let result = self
            .retry
            .run("cancel_event", || {
                self.provider.cancel_event(self.calendar_id(), remote_event_id)
            })
            .await;
        if let Err(e) = result {
            warn!(remote_event_id, error = %e, "Could not cancel remote event");
        }
    }

    /// Admin cancellation from any non-terminal state.
    pub async fn cancel_slot(&self, slot_id: Uuid, now: DateTime<Utc>) -> Result<Slot, MeetingError> {
        // A concurrent reconciliation may move the slot between our read and
        // write; re-read and retry a few times.
        for _ in 0..3 {
            let slot = self
                .store
                .get_slot(slot_id)
                .await?
                .ok_or(MeetingError::SlotNotFound(slot_id))?;
            if slot.sync_status.is_terminal() {
                return Err(MeetingError::InvalidTransition(format!(
                    "slot {slot_id} is already {}",
                    slot.sync_status
                )));
            }
            if self
                .transition(&slot, &[slot.sync_status], SlotSyncStatus::Cancelled, None, now)
                .await?
            {
                info!(%slot_id, from = %slot.sync_status, "Slot cancelled by admin");
                if let Some(placeholder) = &slot.remote_event_id {
                    self.cancel_remote(placeholder).await;
                }
                return self
                    .store
                    .get_slot(slot_id)
                    .await?
                    .ok_or(MeetingError::SlotNotFound(slot_id));
            }
        }
        Err(MeetingError::InvalidTransition(format!(
            "slot {slot_id} kept changing while being cancelled"
        )))
    }

    /// Compensates bookings stuck in PENDING, e.g. after a crash between the
    /// claim and the confirmation.
    pub async fn recover_stale_bookings(&self, now: DateTime<Utc>) -> Result<usize, MeetingError> {
        let stale = self.store.list_stale_bookings(now - self.stale_after).await?;
        let mut recovered = 0;
        for booking in stale {
            match self.store.compensate_booking(booking.id, now).await {
                Ok(_) => {
                    warn!(booking_id = %booking.id, slot_id = %booking.slot_id, "Stale PENDING booking compensated");
                    recovered += 1;
                }
                // Confirmed or failed in the meantime.
                Err(meetsync_common::StoreError::InvalidState(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(recovered)
    }

    /// Generation, reconciliation and stale-booking recovery in one go.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<SyncReport, MeetingError> {
        let (window_start, window_end) = self.generator.default_window(now);
        let generation = match self.generator.generate(window_start, window_end, now).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Slot generation failed");
                None
            }
        };

        let mut report = self.reconcile(now).await?;
        report.generation = generation;
        report.recovered_bookings = self.recover_stale_bookings(now).await?;
        Ok(report)
    }

    /// Runs [`run_pass`](Self::run_pass) every `every` until the task is aborted.
    pub fn spawn_reconciliation_loop(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match self.run_pass(Utc::now()).await {
                    Ok(report) => debug!(?report, "Scheduled sync pass done"),
                    Err(e) => error!(error = %e, "Scheduled sync pass failed"),
                }
            }
        })
    }
}

/// `block` minus every interval in `cuts`.
fn subtract(block: Interval, cuts: &[Interval]) -> Vec<Interval> {
    let mut pieces = vec![block];
    for cut in cuts {
        pieces = pieces
            .into_iter()
            .flat_map(|piece| {
                if piece.overlaps(cut) {
                    [
                        Interval::new(piece.start, cut.start),
                        Interval::new(cut.end, piece.end),
                    ]
                    .into_iter()
                    .flatten()
                    .collect()
                } else {
                    vec![piece]
                }
            })
            .collect();
    }
    pieces
}
