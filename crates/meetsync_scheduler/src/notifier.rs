// --- File: crates/meetsync_scheduler/src/notifier.rs ---
//! Notifier implementations and the stand-in calendar provider used when
//! no calendar is configured.

use chrono_tz::Tz;
use meetsync_common::models::{BusyInterval, Interval, Lead, Proposal, Slot, Booking};
use meetsync_common::{
    BoxFuture, CalendarProvider, CreatedEvent, NewCalendarEvent, Notifier, NotifierError,
    ProviderError, RemoteEventStatus, HTTP_CLIENT,
};
use meetsync_config::models::NotifierConfig;
use serde::Serialize;
use tracing::{debug, info};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Serialize, Debug)]
struct ResendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<&'a str>,
    subject: String,
    text: String,
}

/// Sends plain-text e-mails through the Resend HTTP API.
pub struct ResendNotifier {
    api_key: String,
    from_address: String,
    admin_address: Option<String>,
    api_url: String,
    time_zone: Tz,
}

impl ResendNotifier {
    pub fn new(config: &NotifierConfig, time_zone: Tz) -> Self {
        Self {
            api_key: config.resend_api_key.clone(),
            from_address: config.from_address.clone(),
            admin_address: config.admin_address.clone(),
            api_url: RESEND_API_URL.to_string(),
            time_zone,
        }
    }

    /// Points the notifier at a different endpoint, e.g. a local mock.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn local_time(&self, slot: &Slot) -> String {
        format!(
            "{} - {} ({})",
            slot.start_time
                .with_timezone(&self.time_zone)
                .format("%Y-%m-%d %H:%M"),
            slot.end_time.with_timezone(&self.time_zone).format("%H:%M"),
            self.time_zone
        )
    }

    async fn send(&self, to: &str, subject: String, text: String) -> Result<(), NotifierError> {
        let email = ResendEmail {
            from: &self.from_address,
            to: vec![to],
            bcc: self.admin_address.as_deref().into_iter().collect(),
            subject,
            text,
        };
        let response = HTTP_CLIENT
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, subject = %email.subject, "E-mail accepted");
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "no response body".to_string());
        if status.is_client_error() {
            Err(NotifierError::Rejected(format!("{status}: {body}")))
        } else {
            Err(NotifierError::Transport(format!("{status}: {body}")))
        }
    }
}

impl Notifier for ResendNotifier {
    fn send_booking_confirmation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            let mut text = format!(
                "Hello {},\n\nyour meeting is confirmed for {}.\n",
                lead.contact_name,
                self.local_time(slot)
            );
            if let Some(link) = &booking.join_link {
                text.push_str(&format!("Join link: {link}\n"));
            }
            if let Some(agenda) = &booking.agenda {
                text.push_str(&format!("\nAgenda:\n{agenda}\n"));
            }
            text.push_str(&format!("\nBooking reference: {}\n", booking.id));
            self.send(&lead.email, "Your meeting is confirmed".to_string(), text)
                .await
        })
    }

    fn send_booking_cancellation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            let text = format!(
                "Hello {},\n\nyour meeting on {} has been cancelled.\n\nBooking reference: {}\n",
                lead.contact_name,
                self.local_time(slot),
                booking.id
            );
            self.send(&lead.email, "Your meeting has been cancelled".to_string(), text)
                .await
        })
    }

    fn send_proposal<'a>(
        &'a self,
        proposal: &'a Proposal,
        booking_url: &'a str,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            let text = format!(
                "Hello {},\n\nplease pick a time for our meeting:\n{}\n\nThe link is valid until {}.\n",
                lead.contact_name,
                booking_url,
                proposal
                    .expires_at
                    .with_timezone(&self.time_zone)
                    .format("%Y-%m-%d %H:%M %Z")
            );
            self.send(&lead.email, "Pick a time for our meeting".to_string(), text)
                .await
        })
    }
}

/// Logs notifications instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_booking_confirmation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            info!(booking_id = %booking.id, start = %slot.start_time, to = %lead.email, "Booking confirmation (not sent)");
            Ok(())
        })
    }

    fn send_booking_cancellation<'a>(
        &'a self,
        booking: &'a Booking,
        slot: &'a Slot,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            info!(booking_id = %booking.id, start = %slot.start_time, to = %lead.email, "Booking cancellation (not sent)");
            Ok(())
        })
    }

    fn send_proposal<'a>(
        &'a self,
        proposal: &'a Proposal,
        booking_url: &'a str,
        lead: &'a Lead,
    ) -> BoxFuture<'a, (), NotifierError> {
        Box::pin(async move {
            info!(lead_id = %proposal.lead_id, booking_url, to = %lead.email, "Proposal e-mail (not sent)");
            Ok(())
        })
    }
}

/// Calendar provider for deployments without a calendar. Every call fails
/// as unavailable, so generation runs degraded and bookings are compensated.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCalendarProvider;

impl UnavailableCalendarProvider {
    fn unavailable<T>() -> Result<T, ProviderError> {
        Err(ProviderError::Unavailable(
            "no calendar provider configured".to_string(),
        ))
    }
}

impl CalendarProvider for UnavailableCalendarProvider {
    fn query_free_busy<'a>(
        &'a self,
        _calendar_id: &'a str,
        _window: Interval,
    ) -> BoxFuture<'a, Vec<BusyInterval>, ProviderError> {
        Box::pin(async { Self::unavailable() })
    }

    fn create_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        _event: NewCalendarEvent,
    ) -> BoxFuture<'a, CreatedEvent, ProviderError> {
        Box::pin(async { Self::unavailable() })
    }

    fn cancel_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        _remote_event_id: &'a str,
    ) -> BoxFuture<'a, (), ProviderError> {
        Box::pin(async { Self::unavailable() })
    }

    fn get_event_status<'a>(
        &'a self,
        _calendar_id: &'a str,
        _remote_event_id: &'a str,
    ) -> BoxFuture<'a, Option<RemoteEventStatus>, ProviderError> {
        Box::pin(async { Self::unavailable() })
    }
}
