// --- File: crates/meetsync_common/src/store/mod.rs ---
//! Persistence abstraction for slots, proposals, bookings and leads.
//!
//! Each method is one transaction. The multi-record steps of the booking
//! flow (`claim_slot`, `compensate_booking`, `cancel_booking`) must be
//! applied atomically by every implementation.

pub mod memory;
#[cfg(test)]
mod memory_test;

use crate::models::{Booking, BookingStatus, Lead, Proposal, Slot, SlotSyncStatus};
use crate::services::BoxFuture;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The record is not in a state that allows the requested change.
    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Compare-and-swap on a slot's sync status.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTransition {
    pub slot_id: Uuid,
    /// The transition applies only while the slot is in one of these states.
    pub from: Vec<SlotSyncStatus>,
    pub to: SlotSyncStatus,
    /// New placeholder id; `None` clears it.
    pub remote_event_id: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// Input of the atomic claim step.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub token: String,
    pub slot_id: Uuid,
    /// The PENDING booking to insert when the claim succeeds.
    pub booking: Booking,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Booking),
    /// Full, blocked, started, or missing. Nothing was written.
    SlotUnavailable,
    /// Token is not ACTIVE, is expired, or is unknown. Nothing was written.
    TokenNotRedeemable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub slot_id: Option<Uuid>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| s == booking.status)
            && self.slot_id.map_or(true, |id| id == booking.slot_id)
    }
}

pub trait Store: Send + Sync {
    /// Inserts `slot` unless a slot with the same calendar, start and end
    /// exists. Returns the inserted slot, or `None` when it was skipped.
    fn insert_slot_if_absent(&self, slot: Slot) -> BoxFuture<'_, Option<Slot>, StoreError>;

    fn get_slot(&self, id: Uuid) -> BoxFuture<'_, Option<Slot>, StoreError>;

    /// Slots in `ids`, in the order given. Unknown ids are omitted.
    fn get_slots<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Vec<Slot>, StoreError>;

    /// Slots starting in `[from, to)`, ordered by start time.
    fn list_slots(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Slot>, StoreError>;

    /// Non-cancelled slots starting at or after `from`.
    fn list_reconcilable_slots(&self, from: DateTime<Utc>) -> BoxFuture<'_, Vec<Slot>, StoreError>;

    /// Applies `transition` if the slot is currently in one of its `from`
    /// states. Returns whether it was applied. Never touches `claimed_count`.
    fn transition_slot(&self, transition: SlotTransition) -> BoxFuture<'_, bool, StoreError>;

    fn insert_proposal(&self, proposal: Proposal) -> BoxFuture<'_, (), StoreError>;

    fn get_proposal<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<Proposal>, StoreError>;

    /// ACTIVE -> REVOKED. Returns whether the token was revoked.
    fn revoke_proposal<'a>(
        &'a self,
        token: &'a str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, bool, StoreError>;

    /// Atomically takes one unit of capacity, redeems the token and inserts
    /// the PENDING booking. The slot is checked first, so of two racing
    /// claims with the same token the loser sees `SlotUnavailable` or
    /// `TokenNotRedeemable`, never a second booking.
    fn claim_slot(&self, request: ClaimRequest) -> BoxFuture<'_, ClaimOutcome, StoreError>;

    /// PENDING -> CONFIRMED with the remote event recorded.
    fn confirm_booking(
        &self,
        booking_id: Uuid,
        remote_event_id: String,
        join_link: Option<String>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError>;

    /// Undoes a claim: the booking becomes FAILED, the slot gets its unit of
    /// capacity back, and the token returns to ACTIVE. Only PENDING bookings
    /// can be compensated.
    fn compensate_booking(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError>;

    /// CONFIRMED -> CANCELLED, releasing the claim.
    fn cancel_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> BoxFuture<'_, Booking, StoreError>;

    fn get_booking(&self, id: Uuid) -> BoxFuture<'_, Option<Booking>, StoreError>;

    fn list_bookings(&self, filter: BookingFilter) -> BoxFuture<'_, Vec<Booking>, StoreError>;

    /// PENDING bookings last updated before `older_than`.
    fn list_stale_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Booking>, StoreError>;

    fn find_lead<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<Lead>, StoreError>;

    fn upsert_lead(&self, lead: Lead) -> BoxFuture<'_, (), StoreError>;
}
