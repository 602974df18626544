// --- File: crates/meetsync_common/src/services.rs ---
//! Collaborator abstractions for external services.
//!
//! The engine talks to the outside world through two traits: a
//! [`CalendarProvider`] (free/busy queries and event management) and a
//! [`Notifier`] (emails to leads and admins). Both return boxed futures so
//! they can be held as `Arc<dyn Trait>` and swapped for fakes in tests.

use crate::models::{Booking, BusyInterval, Interval, Lead, Proposal, Slot};
use crate::retry::Retryable;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Failures reported by a calendar provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Calendar provider unavailable: {0}")]
    Unavailable(String),

    #[error("Calendar provider rejected credentials: {0}")]
    AuthError(String),

    #[error("Calendar conflict: {0}")]
    Conflict(String),

    #[error("Calendar event not found: {0}")]
    NotFound(String),

    #[error("Calendar provider timed out after {0:?}")]
    Timeout(Duration),
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Timeout(_))
    }

    fn timed_out(after: Duration) -> Self {
        ProviderError::Timeout(after)
    }
}

/// Failures reported by a notifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifierError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

impl Retryable for NotifierError {
    fn is_retryable(&self) -> bool {
        !matches!(self, NotifierError::Rejected(_))
    }

    fn timed_out(after: Duration) -> Self {
        NotifierError::Timeout(after)
    }
}

/// What a created remote event stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Marks a proposed slot on the owner's calendar without blocking free/busy.
    Placeholder,
    /// A confirmed meeting with the lead as attendee.
    Booking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub summary: String,
    pub description: Option<String>,
    pub interval: Interval,
    pub attendees: Vec<String>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub remote_event_id: String,
    pub join_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Operations the engine needs from a remote calendar.
pub trait CalendarProvider: Send + Sync {
    /// Busy blocks on `calendar_id` between `start` and `end`.
    fn query_free_busy<'a>(
        &'a self,
        calendar_id: &'a str,
        window: Interval,
    ) -> BoxFuture<'a, Vec<BusyInterval>, ProviderError>;

    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: NewCalendarEvent,
    ) -> BoxFuture<'a, CreatedEvent, ProviderError>;

    /// Cancels an event. Cancelling an event that is already gone succeeds.
    fn cancel_event<'a>(
        &'a self,
        calendar_id: &'a str,
        remote_event_id: &'a str,
    ) -> BoxFuture<'a, (), ProviderError>;

    /// `None` when the event no longer exists.
    fn get_event_status<'a>(
        &'a self,
        calendar_id: &'a str,
        remote_event_id: &'a str,
    ) -> BoxFuture<'a, Option<RemoteEventStatus>, ProviderError>;
}

/// Outbound notifications. Every call is best-effort from the engine's view.
pub trait Notifier: Send + Sync {
    fn send_booking_confirmation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError>;

    fn send_booking_cancellation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError>;

    /// Sends the lead their personal booking link.
    fn send_proposal<'a>(
        &'a self,
        proposal: &'a Proposal,
        booking_url: &'a str,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError>;
}
