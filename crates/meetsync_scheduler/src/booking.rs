// --- File: crates/meetsync_scheduler/src/booking.rs ---
//! Converting a proposal token into a confirmed booking.
//!
//! The claim (capacity, token redemption and PENDING booking) is one store
//! operation. The remote event is created afterwards, outside any
//! transaction; if that fails the claim is compensated so the slot capacity
//! and the token are handed back.

use chrono::Utc;
use meetsync_common::models::{Booking, BookingStatus, Lead, Slot};
use meetsync_common::{
    CalendarProvider, ClaimOutcome, ClaimRequest, EventKind, NewCalendarEvent, Notifier,
    RetryPolicy, Store,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::MeetingError;
use crate::proposal::ProposalIssuer;

#[derive(Clone)]
pub struct BookingEngine {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
    notifier: Arc<dyn Notifier>,
    proposals: Arc<ProposalIssuer>,
    retry: RetryPolicy,
    calendar_id: Arc<str>,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        notifier: Arc<dyn Notifier>,
        proposals: Arc<ProposalIssuer>,
        retry: RetryPolicy,
        calendar_id: &str,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            proposals,
            retry,
            calendar_id: Arc::from(calendar_id),
        }
    }

    /// Books `slot_id` with `token`.
    ///
    /// Resolves to a CONFIRMED booking or to an error with every local
    /// change already undone.
    pub async fn book(
        &self,
        token: &str,
        slot_id: Uuid,
        agenda: Option<String>,
    ) -> Result<Booking, MeetingError> {
        let now = Utc::now();
        let proposal = self.proposals.load_active(token, now).await?;
        if !proposal.contains_slot(&slot_id) {
            return Err(MeetingError::SlotNotInProposal(slot_id));
        }
        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or(MeetingError::SlotUnavailable)?;
        let lead = self
            .store
            .find_lead(&proposal.lead_id)
            .await?
            .ok_or_else(|| MeetingError::LeadNotFound(proposal.lead_id.clone()))?;

        let agenda = agenda
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let outcome = self
            .store
            .claim_slot(ClaimRequest {
                token: token.to_string(),
                slot_id,
                booking: Booking::pending(slot_id, &lead.id, token, agenda, now),
                now,
            })
            .await?;

        let booking = match outcome {
            ClaimOutcome::Claimed(booking) => booking,
            ClaimOutcome::SlotUnavailable => {
                debug!(%slot_id, "Claim lost: slot unavailable");
                return Err(MeetingError::SlotUnavailable);
            }
            ClaimOutcome::TokenNotRedeemable => {
                // Re-read to report why, usually a concurrent booking with the same token.
                return Err(match self.proposals.load_active(token, Utc::now()).await {
                    Err(e) => e,
                    Ok(_) => MeetingError::TokenAlreadyRedeemed,
                });
            }
        };
        info!(booking_id = %booking.id, %slot_id, lead_id = %lead.id, "Slot claimed");

        // The remote side effect runs on its own task so a dropped request
        // still ends in CONFIRMED or compensated.
        let engine = self.clone();
        tokio::spawn(async move { engine.finish(booking, slot, lead).await })
            .await
            .map_err(|e| MeetingError::CalendarSyncFailed(format!("booking task aborted: {e}")))?
    }

    async fn finish(&self, booking: Booking, slot: Slot, lead: Lead) -> Result<Booking, MeetingError> {
        let event = NewCalendarEvent {
            summary: meeting_summary(&lead),
            description: booking.agenda.clone(),
            interval: slot.interval(),
            attendees: vec![lead.email.clone()],
            kind: EventKind::Booking,
        };
        let created = self
            .retry
            .run("create_booking_event", || {
                self.provider.create_event(&self.calendar_id, event.clone())
            })
            .await;

        let created = match created {
            Ok(created) => created,
            Err(e) => {
                error!(booking_id = %booking.id, error = %e, "Booking event creation failed, compensating");
                self.compensate(&booking).await;
                return Err(MeetingError::CalendarSyncFailed(e.to_string()));
            }
        };

        let confirmed = self
            .store
            .confirm_booking(
                booking.id,
                created.remote_event_id.clone(),
                created.join_link.clone(),
                Utc::now(),
            )
            .await;
        let confirmed = match confirmed {
            Ok(confirmed) => confirmed,
            Err(e) => {
                error!(booking_id = %booking.id, error = %e, "Booking confirmation failed, compensating");
                self.cancel_remote(&created.remote_event_id).await;
                self.compensate(&booking).await;
                return Err(e.into());
            }
        };
        info!(
            booking_id = %confirmed.id,
            slot_id = %confirmed.slot_id,
            remote_event_id = %created.remote_event_id,
            "Booking confirmed"
        );

        self.spawn_mail(MailKind::Confirmation, confirmed.clone(), slot, lead);
        Ok(confirmed)
    }

    /// Sends a booking e-mail in the background, with retries. Failures are
    /// only logged.
    fn spawn_mail(&self, kind: MailKind, booking: Booking, slot: Slot, lead: Lead) {
        let notifier = self.notifier.clone();
        let retry = self.retry.clone();
        tokio::spawn(async move {
            let sent = retry
                .run(kind.operation(), || match kind {
                    MailKind::Confirmation => {
                        notifier.send_booking_confirmation(&booking, &slot, &lead)
                    }
                    MailKind::Cancellation => {
                        notifier.send_booking_cancellation(&booking, &slot, &lead)
                    }
                })
                .await;
            if let Err(e) = sent {
                warn!(booking_id = %booking.id, error = %e, mail = kind.operation(), "Booking e-mail not sent");
            }
        });
    }

    /// Undoes a claim. A failure here is picked up by stale-booking recovery.
    async fn compensate(&self, booking: &Booking) {
        match self.store.compensate_booking(booking.id, Utc::now()).await {
            Ok(_) => info!(booking_id = %booking.id, slot_id = %booking.slot_id, "Claim released, token active again"),
            Err(e) => error!(booking_id = %booking.id, error = %e, "Compensation failed"),
        }
    }

    async fn cancel_remote(&self, remote_event_id: &str) {
        let result = self
            .retry
            .run("cancel_booking_event", || {
                self.provider.cancel_event(&self.calendar_id, remote_event_id)
            })
            .await;
        if let Err(e) = result {
            warn!(remote_event_id, error = %e, "Could not cancel booking event");
        }
    }

    /// Admin cancellation of a CONFIRMED booking.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, MeetingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(MeetingError::BookingNotFound(booking_id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(MeetingError::InvalidTransition(format!(
                "booking {booking_id} is {}",
                booking.status
            )));
        }

        let cancelled = self.store.cancel_booking(booking_id, Utc::now()).await?;
        info!(%booking_id, slot_id = %cancelled.slot_id, "Booking cancelled");

        if let Some(remote_event_id) = &booking.remote_event_id {
            self.cancel_remote(remote_event_id).await;
        }

        let slot = self.store.get_slot(cancelled.slot_id).await?;
        let lead = self.store.find_lead(&cancelled.lead_id).await?;
        if let (Some(slot), Some(lead)) = (slot, lead) {
            self.spawn_mail(MailKind::Cancellation, cancelled.clone(), slot, lead);
        }
        Ok(cancelled)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, MeetingError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or(MeetingError::BookingNotFound(booking_id))
    }
}

#[derive(Debug, Clone, Copy)]
enum MailKind {
    Confirmation,
    Cancellation,
}

impl MailKind {
    fn operation(self) -> &'static str {
        match self {
            MailKind::Confirmation => "send_booking_confirmation",
            MailKind::Cancellation => "send_booking_cancellation",
        }
    }
}

fn meeting_summary(lead: &Lead) -> String {
    match &lead.company_name {
        Some(company) => format!("Meeting with {} ({company})", lead.contact_name),
        None => format!("Meeting with {}", lead.contact_name),
    }
}
