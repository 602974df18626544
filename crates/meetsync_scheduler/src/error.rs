// --- File: crates/meetsync_scheduler/src/error.rs ---
//! Error taxonomy of the booking engine and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meetsync_common::{json_error, StoreError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MeetingError {
    #[error("Booking link not found")]
    TokenNotFound,

    #[error("Booking link has expired")]
    TokenExpired,

    #[error("Booking link has already been used")]
    TokenAlreadyRedeemed,

    #[error("Booking link has been revoked")]
    TokenRevoked,

    #[error("Slot {0} is not part of this proposal")]
    SlotNotInProposal(Uuid),

    #[error("Slot is no longer available, please pick another time")]
    SlotUnavailable,

    #[error("Calendar event could not be created: {0}")]
    CalendarSyncFailed(String),

    #[error("Invalid slot set: {0}")]
    InvalidSlotSet(String),

    #[error("Proposal lifetime must be positive")]
    InvalidTtl,

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MeetingError {
    /// Stable machine readable code returned in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MeetingError::TokenNotFound => "TOKEN_NOT_FOUND",
            MeetingError::TokenExpired => "TOKEN_EXPIRED",
            MeetingError::TokenAlreadyRedeemed => "TOKEN_ALREADY_REDEEMED",
            MeetingError::TokenRevoked => "TOKEN_REVOKED",
            MeetingError::SlotNotInProposal(_) => "SLOT_NOT_IN_PROPOSAL",
            MeetingError::SlotUnavailable => "SLOT_UNAVAILABLE",
            MeetingError::CalendarSyncFailed(_) => "CALENDAR_SYNC_FAILED",
            MeetingError::InvalidSlotSet(_) => "INVALID_SLOT_SET",
            MeetingError::InvalidTtl => "INVALID_TTL",
            MeetingError::LeadNotFound(_) => "LEAD_NOT_FOUND",
            MeetingError::SlotNotFound(_) => "SLOT_NOT_FOUND",
            MeetingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            MeetingError::InvalidTransition(_) => "INVALID_TRANSITION",
            MeetingError::Validation(_) => "VALIDATION_ERROR",
            MeetingError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            MeetingError::Store(StoreError::InvalidState(_)) => "INVALID_TRANSITION",
            MeetingError::Store(StoreError::Duplicate(_)) => "DUPLICATE",
            MeetingError::Store(_) => "STORE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MeetingError::TokenNotFound
            | MeetingError::LeadNotFound(_)
            | MeetingError::SlotNotFound(_)
            | MeetingError::BookingNotFound(_)
            | MeetingError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            MeetingError::TokenExpired
            | MeetingError::TokenAlreadyRedeemed
            | MeetingError::TokenRevoked => StatusCode::GONE,
            MeetingError::SlotNotInProposal(_)
            | MeetingError::InvalidSlotSet(_)
            | MeetingError::InvalidTtl
            | MeetingError::Validation(_) => StatusCode::BAD_REQUEST,
            MeetingError::SlotUnavailable
            | MeetingError::InvalidTransition(_)
            | MeetingError::Store(StoreError::InvalidState(_))
            | MeetingError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            MeetingError::CalendarSyncFailed(_) => StatusCode::BAD_GATEWAY,
            MeetingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MeetingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }
        let message = match &self {
            // Backend details stay in the log.
            MeetingError::Store(StoreError::Backend(_)) => "Internal storage error".to_string(),
            other => other.to_string(),
        };
        json_error(status, self.code(), message)
    }
}
