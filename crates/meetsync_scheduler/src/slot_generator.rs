// --- File: crates/meetsync_scheduler/src/slot_generator.rs ---
//! Turns candidate intervals into stored slots.

use chrono::{DateTime, Duration, Utc};
use meetsync_common::models::{BusyInterval, Interval, Slot, SlotSyncStatus};
use meetsync_common::{CalendarProvider, RetryPolicy, Store, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::MeetingError;
use crate::working_hours::{generate_candidate_intervals, WorkingHoursRules};

/// Builds slot records for `intervals`.
///
/// With free/busy data, an interval overlapping any busy block becomes BUSY
/// and every other interval PENDING. Without it (degraded mode) everything
/// is PENDING.
pub fn materialize(
    calendar_id: &str,
    intervals: &[Interval],
    free_busy: Option<&[BusyInterval]>,
    capacity: u32,
    now: DateTime<Utc>,
) -> Vec<Slot> {
    intervals
        .iter()
        .map(|interval| {
            let busy = free_busy
                .map(|blocks| blocks.iter().any(|b| b.overlaps(interval)))
                .unwrap_or(false);
            let status = if busy {
                SlotSyncStatus::Busy
            } else {
                SlotSyncStatus::Pending
            };
            Slot::new(calendar_id, *interval, capacity, status, now)
        })
        .collect()
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: usize,
    pub created_busy: usize,
    /// Intervals that already had a slot.
    pub skipped: usize,
    /// Free/busy was unavailable and every slot was created PENDING.
    pub degraded: bool,
}

pub struct SlotGenerator {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
    retry: RetryPolicy,
    rules: WorkingHoursRules,
    calendar_id: String,
    capacity: u32,
    advance: Duration,
}

impl SlotGenerator {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        retry: RetryPolicy,
        rules: WorkingHoursRules,
        calendar_id: impl Into<String>,
        capacity: u32,
        advance_days: i64,
    ) -> Self {
        Self {
            store,
            provider,
            retry,
            rules,
            calendar_id: calendar_id.into(),
            capacity: capacity.max(1),
            advance: Duration::days(advance_days.max(1)),
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// The rolling booking horizon `[now, now + advance_days)`.
    pub fn default_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now + self.advance)
    }

    /// Stores a one-off slot outside the working-hours rules. It starts
    /// PENDING and gets its placeholder on the next reconciliation pass.
    pub async fn add_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capacity: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Slot, MeetingError> {
        let interval = Interval::new(start, end).ok_or_else(|| {
            MeetingError::Validation("`end_time` must be after `start_time`".to_string())
        })?;
        if start <= now {
            return Err(MeetingError::Validation(
                "slot must start in the future".to_string(),
            ));
        }
        let capacity = capacity.unwrap_or(self.capacity);
        if capacity == 0 {
            return Err(MeetingError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }

        let slot = Slot::new(&self.calendar_id, interval, capacity, SlotSyncStatus::Pending, now);
        match self.store.insert_slot_if_absent(slot).await? {
            Some(slot) => {
                info!(slot_id = %slot.id, %start, %end, capacity, "Manual slot added");
                Ok(slot)
            }
            None => Err(StoreError::Duplicate(format!("a slot from {start} to {end} already exists")).into()),
        }
    }

    /// Generates and stores slots for `[window_start, window_end)`.
    ///
    /// Re-running over the same window creates nothing new.
    pub async fn generate(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<GenerationReport, MeetingError> {
        let intervals = generate_candidate_intervals(window_start, window_end, &self.rules, now);
        let mut report = GenerationReport::default();
        let Some(window) = Interval::new(window_start, window_end) else {
            return Ok(report);
        };
        if intervals.is_empty() {
            debug!(%window_start, %window_end, "No candidate intervals in window");
            return Ok(report);
        }

        let free_busy = self
            .retry
            .run("query_free_busy", || {
                self.provider.query_free_busy(&self.calendar_id, window)
            })
            .await;
        let free_busy = match free_busy {
            Ok(blocks) => Some(blocks),
            Err(e) => {
                warn!(
                    calendar_id = %self.calendar_id,
                    error = %e,
                    "Free/busy unavailable, generating slots in degraded mode"
                );
                report.degraded = true;
                None
            }
        };

        let slots = materialize(
            &self.calendar_id,
            &intervals,
            free_busy.as_deref(),
            self.capacity,
            now,
        );
        for slot in slots {
            let busy = slot.sync_status == SlotSyncStatus::Busy;
            match self.store.insert_slot_if_absent(slot).await? {
                Some(_) if busy => {
                    report.created += 1;
                    report.created_busy += 1;
                }
                Some(_) => report.created += 1,
                None => report.skipped += 1,
            }
        }

        info!(
            created = report.created,
            busy = report.created_busy,
            skipped = report.skipped,
            degraded = report.degraded,
            "Slot generation finished"
        );
        Ok(report)
    }
}
