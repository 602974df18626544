// --- File: crates/meetsync_common/src/models.rs ---

//! Domain model of the meeting availability and booking engine.
//!
//! Status fields are closed enums; each one serializes to the upper-case
//! names stored in the database (`PENDING`, `SYNCED`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A half-open time range `[start, end)`.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// A busy block reported by the calendar provider's free/busy query.
pub type BusyInterval = Interval;

/// Error returned when a stored status string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status value: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownStatus(other.to_string())),
                }
            }
        }
    };
}

status_enum!(
    /// Synchronization state of a [`Slot`] against the remote calendar.
    SlotSyncStatus {
        Pending => "PENDING",
        Synced => "SYNCED",
        Busy => "BUSY",
        Error => "ERROR",
        Cancelled => "CANCELLED",
    }
);

impl SlotSyncStatus {
    /// States in which no new claim may be taken.
    pub fn blocks_claims(&self) -> bool {
        matches!(
            self,
            SlotSyncStatus::Busy | SlotSyncStatus::Cancelled | SlotSyncStatus::Error
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotSyncStatus::Cancelled)
    }
}

status_enum!(
    /// Stored state of a proposal token. See [`Proposal::effective_status`].
    ProposalStatus {
        Active => "ACTIVE",
        Redeemed => "REDEEMED",
        Expired => "EXPIRED",
        Revoked => "REVOKED",
    }
);

status_enum!(
    BookingStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Cancelled => "CANCELLED",
        Failed => "FAILED",
    }
);

impl BookingStatus {
    /// Bookings in these states hold one unit of their slot's capacity.
    pub fn holds_capacity(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

status_enum!(
    CalendarSyncStatus {
        Pending => "PENDING",
        Synced => "SYNCED",
        Error => "ERROR",
    }
);

/// A bookable time interval on one calendar.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub claimed_count: u32,
    pub owner_calendar_id: String,
    pub remote_event_id: Option<String>,
    pub sync_status: SlotSyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(
        owner_calendar_id: &str,
        interval: Interval,
        capacity: u32,
        sync_status: SlotSyncStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time: interval.start,
            end_time: interval.end,
            capacity: capacity.max(1),
            claimed_count: 0,
            owner_calendar_id: owner_calendar_id.to_string(),
            remote_event_id: None,
            sync_status,
            last_synced_at: None,
            created_at: now,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.claimed_count)
    }

    /// The single availability predicate: a claim may be taken right now.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        !self.sync_status.blocks_claims()
            && self.claimed_count < self.capacity
            && self.start_time > now
    }
}

/// A capability handed to a lead: book one of `slot_ids`, once, before `expires_at`.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub token: String,
    pub lead_id: String,
    pub slot_ids: Vec<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub status: ProposalStatus,
}

impl Proposal {
    /// Status as seen by every reader: past `expires_at` the token is expired
    /// whatever the stored status says.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ProposalStatus {
        if now >= self.expires_at {
            ProposalStatus::Expired
        } else {
            self.status
        }
    }

    pub fn contains_slot(&self, slot_id: &Uuid) -> bool {
        self.slot_ids.contains(slot_id)
    }
}

/// Contact details of a lead, owned by the lead-capture side of the system.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub contact_name: String,
    pub email: String,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

/// The confirmed (or attempted) association between a lead and a slot.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub lead_id: String,
    /// Token the booking was made with; needed to re-activate it on compensation.
    pub token: String,
    pub status: BookingStatus,
    pub calendar_sync_status: CalendarSyncStatus,
    pub remote_event_id: Option<String>,
    pub join_link: Option<String>,
    pub agenda: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh PENDING booking, as inserted by the claim step.
    pub fn pending(
        slot_id: Uuid,
        lead_id: &str,
        token: &str,
        agenda: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot_id,
            lead_id: lead_id.to_string(),
            token: token.to_string(),
            status: BookingStatus::Pending,
            calendar_sync_status: CalendarSyncStatus::Pending,
            remote_event_id: None,
            join_link: None,
            agenda,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One bookable slot as shown to a lead.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub remaining_capacity: u32,
}

impl From<&Slot> for AvailableSlot {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            remaining_capacity: slot.remaining_capacity(),
        }
    }
}

/// Public lead details echoed back on the availability page.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadInfo {
    pub contact_name: String,
    pub company_name: Option<String>,
}

/// Live availability for a token: the bound slots that can still be claimed.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalView {
    pub expires_at: DateTime<Utc>,
    pub lead_info: Option<LeadInfo>,
    pub slots: Vec<AvailableSlot>,
    /// Slots keyed by local calendar date (`YYYY-MM-DD`).
    pub slots_by_date: BTreeMap<String, Vec<AvailableSlot>>,
    pub total_slots: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn interval_rejects_empty_ranges() {
        assert!(Interval::new(at(10), at(10)).is_none());
        assert!(Interval::new(at(11), at(10)).is_none());
        assert!(Interval::new(at(10), at(11)).is_some());
    }

    #[test]
    fn adjacent_intervals_do_not_overlap() {
        let a = Interval::new(at(10), at(11)).unwrap();
        let b = Interval::new(at(11), at(12)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Interval::new(at(10), at(12)).unwrap()));
    }

    #[test]
    fn status_strings_round_trip_through_from_str() {
        for status in [
            SlotSyncStatus::Pending,
            SlotSyncStatus::Synced,
            SlotSyncStatus::Busy,
            SlotSyncStatus::Error,
            SlotSyncStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SlotSyncStatus>(), Ok(status));
        }
        assert!("AVAILABLE".parse::<SlotSyncStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            "\"CONFIRMED\""
        );
    }

    #[test]
    fn busy_cancelled_and_error_slots_are_not_claimable() {
        let now = at(8);
        let interval = Interval::new(at(10), at(11)).unwrap();
        for status in [SlotSyncStatus::Busy, SlotSyncStatus::Cancelled, SlotSyncStatus::Error] {
            let slot = Slot::new("primary", interval, 1, status, now);
            assert!(!slot.is_claimable(now), "{status} must block claims");
        }
        let slot = Slot::new("primary", interval, 1, SlotSyncStatus::Pending, now);
        assert!(slot.is_claimable(now));
        assert!(!slot.is_claimable(at(10)), "started slots are not claimable");
    }

    #[test]
    fn full_slot_is_not_claimable() {
        let now = at(8);
        let interval = Interval::new(at(10), at(11)).unwrap();
        let mut slot = Slot::new("primary", interval, 2, SlotSyncStatus::Synced, now);
        slot.claimed_count = 2;
        assert_eq!(slot.remaining_capacity(), 0);
        assert!(!slot.is_claimable(now));
    }

    #[test]
    fn expiry_overrides_stored_status() {
        let issued = at(8);
        let proposal = Proposal {
            token: "t".to_string(),
            lead_id: "lead-1".to_string(),
            slot_ids: vec![],
            issued_at: issued,
            expires_at: issued + Duration::hours(1),
            redeemed_at: None,
            status: ProposalStatus::Active,
        };
        assert_eq!(proposal.effective_status(issued), ProposalStatus::Active);
        assert_eq!(
            proposal.effective_status(issued + Duration::hours(2)),
            ProposalStatus::Expired
        );
    }
}
