// --- File: crates/meetsync_common/src/store/memory.rs ---
//! In-process [`Store`] used by tests and by deployments without a database.
//!
//! All state sits behind one async mutex, so every method is trivially
//! atomic with respect to the others.

use super::{BookingFilter, ClaimOutcome, ClaimRequest, SlotTransition, Store, StoreError};
use crate::models::{
    Booking, BookingStatus, CalendarSyncStatus, Lead, Proposal, ProposalStatus, Slot,
    SlotSyncStatus,
};
use crate::services::BoxFuture;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    slots: HashMap<Uuid, Slot>,
    proposals: HashMap<String, Proposal>,
    bookings: HashMap<Uuid, Booking>,
    leads: HashMap<String, Lead>,
}

impl Tables {
    fn booking_mut(&mut self, id: Uuid) -> Result<&mut Booking, StoreError> {
        self.bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {id}")))
    }

    fn release_claim(&mut self, slot_id: Uuid) {
        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.claimed_count = slot.claimed_count.saturating_sub(1);
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn insert_slot_if_absent(&self, slot: Slot) -> BoxFuture<'_, Option<Slot>, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let exists = tables.slots.values().any(|s| {
                s.owner_calendar_id == slot.owner_calendar_id
                    && s.start_time == slot.start_time
                    && s.end_time == slot.end_time
            });
            if exists {
                return Ok(None);
            }
            tables.slots.insert(slot.id, slot.clone());
            Ok(Some(slot))
        })
    }

    fn get_slot(&self, id: Uuid) -> BoxFuture<'_, Option<Slot>, StoreError> {
        Box::pin(async move { Ok(self.tables.lock().await.slots.get(&id).cloned()) })
    }

    fn get_slots<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Vec<Slot>, StoreError> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            Ok(ids
                .iter()
                .filter_map(|id| tables.slots.get(id).cloned())
                .collect())
        })
    }

    fn list_slots(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Slot>, StoreError> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut slots: Vec<Slot> = tables
                .slots
                .values()
                .filter(|s| s.start_time >= from && s.start_time < to)
                .cloned()
                .collect();
            slots.sort_by_key(|s| (s.start_time, s.id));
            Ok(slots)
        })
    }

    fn list_reconcilable_slots(&self, from: DateTime<Utc>) -> BoxFuture<'_, Vec<Slot>, StoreError> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut slots: Vec<Slot> = tables
                .slots
                .values()
                .filter(|s| s.start_time >= from && !s.sync_status.is_terminal())
                .cloned()
                .collect();
            slots.sort_by_key(|s| (s.start_time, s.id));
            Ok(slots)
        })
    }

    fn transition_slot(&self, transition: SlotTransition) -> BoxFuture<'_, bool, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let Some(slot) = tables.slots.get_mut(&transition.slot_id) else {
                return Err(StoreError::NotFound(format!("slot {}", transition.slot_id)));
            };
            if !transition.from.contains(&slot.sync_status) {
                return Ok(false);
            }
            slot.sync_status = transition.to;
            slot.remote_event_id = transition.remote_event_id;
            slot.last_synced_at = Some(transition.synced_at);
            Ok(true)
        })
    }

    fn insert_proposal(&self, proposal: Proposal) -> BoxFuture<'_, (), StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            if tables.proposals.contains_key(&proposal.token) {
                return Err(StoreError::Duplicate("proposal token".to_string()));
            }
            tables.proposals.insert(proposal.token.clone(), proposal);
            Ok(())
        })
    }

    fn get_proposal<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<Proposal>, StoreError> {
        Box::pin(async move { Ok(self.tables.lock().await.proposals.get(token).cloned()) })
    }

    fn revoke_proposal<'a>(
        &'a self,
        token: &'a str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, bool, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            match tables.proposals.get_mut(token) {
                Some(p) if p.effective_status(now) == ProposalStatus::Active => {
                    p.status = ProposalStatus::Revoked;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn claim_slot(&self, request: ClaimRequest) -> BoxFuture<'_, ClaimOutcome, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let tables = &mut *tables;

            let Some(slot) = tables.slots.get_mut(&request.slot_id) else {
                return Ok(ClaimOutcome::SlotUnavailable);
            };
            if !slot.is_claimable(request.now) {
                return Ok(ClaimOutcome::SlotUnavailable);
            }

            let Some(proposal) = tables.proposals.get_mut(&request.token) else {
                return Ok(ClaimOutcome::TokenNotRedeemable);
            };
            if proposal.effective_status(request.now) != ProposalStatus::Active
                || !proposal.contains_slot(&request.slot_id)
            {
                return Ok(ClaimOutcome::TokenNotRedeemable);
            }

            slot.claimed_count += 1;
            proposal.status = ProposalStatus::Redeemed;
            proposal.redeemed_at = Some(request.now);
            tables
                .bookings
                .insert(request.booking.id, request.booking.clone());
            Ok(ClaimOutcome::Claimed(request.booking))
        })
    }

    fn confirm_booking(
        &self,
        booking_id: Uuid,
        remote_event_id: String,
        join_link: Option<String>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let booking = tables.booking_mut(booking_id)?;
            if booking.status != BookingStatus::Pending {
                return Err(StoreError::InvalidState(format!(
                    "booking {booking_id} is {}",
                    booking.status
                )));
            }
            booking.status = BookingStatus::Confirmed;
            booking.calendar_sync_status = CalendarSyncStatus::Synced;
            booking.remote_event_id = Some(remote_event_id);
            booking.join_link = join_link;
            booking.updated_at = now;
            Ok(booking.clone())
        })
    }

    fn compensate_booking(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let booking = tables.booking_mut(booking_id)?;
            if booking.status != BookingStatus::Pending {
                return Err(StoreError::InvalidState(format!(
                    "booking {booking_id} is {}",
                    booking.status
                )));
            }
            booking.status = BookingStatus::Failed;
            booking.calendar_sync_status = CalendarSyncStatus::Error;
            booking.updated_at = now;
            let booking = booking.clone();

            tables.release_claim(booking.slot_id);
            if let Some(proposal) = tables.proposals.get_mut(&booking.token) {
                if proposal.status == ProposalStatus::Redeemed {
                    proposal.status = ProposalStatus::Active;
                    proposal.redeemed_at = None;
                }
            }
            Ok(booking)
        })
    }

    fn cancel_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            let mut tables = self.tables.lock().await;
            let booking = tables.booking_mut(booking_id)?;
            if booking.status != BookingStatus::Confirmed {
                return Err(StoreError::InvalidState(format!(
                    "booking {booking_id} is {}",
                    booking.status
                )));
            }
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = now;
            let booking = booking.clone();
            tables.release_claim(booking.slot_id);
            Ok(booking)
        })
    }

    fn get_booking(&self, id: Uuid) -> BoxFuture<'_, Option<Booking>, StoreError> {
        Box::pin(async move { Ok(self.tables.lock().await.bookings.get(&id).cloned()) })
    }

    fn list_bookings(&self, filter: BookingFilter) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut bookings: Vec<Booking> = tables
                .bookings
                .values()
                .filter(|b| filter.matches(b))
                .cloned()
                .collect();
            bookings.sort_by_key(|b| (b.created_at, b.id));
            Ok(bookings)
        })
    }

    fn list_stale_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(async move {
            let tables = self.tables.lock().await;
            let mut bookings: Vec<Booking> = tables
                .bookings
                .values()
                .filter(|b| b.status == BookingStatus::Pending && b.updated_at < older_than)
                .cloned()
                .collect();
            bookings.sort_by_key(|b| (b.created_at, b.id));
            Ok(bookings)
        })
    }

    fn find_lead<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<Lead>, StoreError> {
        Box::pin(async move { Ok(self.tables.lock().await.leads.get(id).cloned()) })
    }

    fn upsert_lead(&self, lead: Lead) -> BoxFuture<'_, (), StoreError> {
        Box::pin(async move {
            self.tables.lock().await.leads.insert(lead.id.clone(), lead);
            Ok(())
        })
    }
}

impl MemoryStore {
    /// Number of bookings holding capacity on `slot_id`.
    pub async fn active_claims(&self, slot_id: Uuid) -> u32 {
        let tables = self.tables.lock().await;
        tables
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id && b.status.holds_capacity())
            .count() as u32
    }

    /// Overwrites a slot's sync status without a compare-and-swap.
    pub async fn force_slot_status(&self, slot_id: Uuid, status: SlotSyncStatus) {
        if let Some(slot) = self.tables.lock().await.slots.get_mut(&slot_id) {
            slot.sync_status = status;
        }
    }
}
