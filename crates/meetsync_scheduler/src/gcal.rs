// --- File: crates/meetsync_scheduler/src/gcal.rs ---
//! Google Calendar implementation of [`CalendarProvider`].

use chrono::Utc;
use google_calendar3::{
    api::{
        ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event, EventAttendee,
        EventDateTime, FreeBusyRequest, FreeBusyRequestItem,
    },
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator},
    CalendarHub,
};
use meetsync_common::models::{BusyInterval, Interval};
use meetsync_common::{
    BoxFuture, CalendarProvider, CreatedEvent, EventKind, NewCalendarEvent, ProviderError,
    RemoteEventStatus,
};
use meetsync_config::models::GcalConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

pub async fn create_calendar_hub(config: &GcalConfig) -> Result<HubType, ProviderError> {
    let key_path = config
        .key_path
        .as_deref()
        .ok_or_else(|| ProviderError::AuthError("missing gcal.key_path".to_string()))?;

    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|e| ProviderError::AuthError(format!("cannot read service account key: {e}")))?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| ProviderError::AuthError(e.to_string()))?;

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| ProviderError::Unavailable(format!("no native TLS roots: {e}")))?
        .https_or_http()
        .enable_http1()
        .build();

    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    Ok(CalendarHub::new(client, auth))
}

/// Maps the API client error onto the provider taxonomy. Status codes are
/// only available through the rendered message.
fn map_api_error(e: google_calendar3::Error) -> ProviderError {
    if let google_calendar3::Error::MissingToken(err) = &e {
        return ProviderError::AuthError(err.to_string());
    }
    let message = e.to_string();
    if message.contains("404") || message.contains("410") {
        ProviderError::NotFound(message)
    } else if message.contains("401") || message.contains("403") {
        ProviderError::AuthError(message)
    } else if message.contains("409") {
        ProviderError::Conflict(message)
    } else {
        ProviderError::Unavailable(message)
    }
}

fn event_time(at: chrono::DateTime<Utc>) -> EventDateTime {
    EventDateTime {
        date_time: Some(at),
        time_zone: Some("UTC".to_string()),
        ..Default::default()
    }
}

pub struct GoogleCalendarProvider {
    calendar_hub: Arc<HubType>,
}

impl GoogleCalendarProvider {
    pub fn new(calendar_hub: Arc<HubType>) -> Self {
        Self { calendar_hub }
    }

    fn build_event(event: NewCalendarEvent) -> Event {
        let mut remote = Event {
            summary: Some(event.summary),
            description: event.description,
            start: Some(event_time(event.interval.start)),
            end: Some(event_time(event.interval.end)),
            attendees: (!event.attendees.is_empty()).then(|| {
                event
                    .attendees
                    .into_iter()
                    .map(|email| EventAttendee {
                        email: Some(email),
                        ..Default::default()
                    })
                    .collect()
            }),
            ..Default::default()
        };
        match event.kind {
            // Placeholders mark the slot on the calendar without blocking it.
            EventKind::Placeholder => remote.transparency = Some("transparent".to_string()),
            EventKind::Booking => {
                remote.conference_data = Some(ConferenceData {
                    create_request: Some(CreateConferenceRequest {
                        request_id: Some(uuid::Uuid::new_v4().to_string()),
                        conference_solution_key: Some(ConferenceSolutionKey {
                            type_: Some("hangoutsMeet".to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
        }
        remote
    }
}

impl CalendarProvider for GoogleCalendarProvider {
    fn query_free_busy<'a>(
        &'a self,
        calendar_id: &'a str,
        window: Interval,
    ) -> BoxFuture<'a, Vec<BusyInterval>, ProviderError> {
        Box::pin(async move {
            let req = FreeBusyRequest {
                time_min: Some(window.start),
                time_max: Some(window.end),
                time_zone: Some("UTC".to_string()),
                items: Some(vec![FreeBusyRequestItem {
                    id: Some(calendar_id.to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            };

            let (_response, freebusy) = self
                .calendar_hub
                .freebusy()
                .query(req)
                .doit()
                .await
                .map_err(map_api_error)?;

            let mut busy = Vec::new();
            let periods = freebusy
                .calendars
                .as_ref()
                .and_then(|calendars| calendars.get(calendar_id))
                .and_then(|info| info.busy.as_ref());
            for period in periods.into_iter().flatten() {
                match (period.start, period.end) {
                    (Some(start), Some(end)) => match Interval::new(start, end) {
                        Some(interval) => busy.push(interval),
                        None => debug!(?period, "Ignoring empty busy period"),
                    },
                    _ => warn!(?period, "Skipping busy period with missing start/end"),
                }
            }
            busy.sort();
            Ok(busy)
        })
    }

    fn create_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: NewCalendarEvent,
    ) -> BoxFuture<'a, CreatedEvent, ProviderError> {
        Box::pin(async move {
            let is_booking = event.kind == EventKind::Booking;
            let mut call = self
                .calendar_hub
                .events()
                .insert(Self::build_event(event), calendar_id);
            if is_booking {
                call = call.conference_data_version(1).send_updates("all");
            }
            let (_response, created) = call.doit().await.map_err(map_api_error)?;

            let remote_event_id = created.id.ok_or_else(|| {
                ProviderError::Unavailable("created event carries no id".to_string())
            })?;
            Ok(CreatedEvent {
                remote_event_id,
                join_link: created.hangout_link,
            })
        })
    }

    fn cancel_event<'a>(
        &'a self,
        calendar_id: &'a str,
        remote_event_id: &'a str,
    ) -> BoxFuture<'a, (), ProviderError> {
        Box::pin(async move {
            let result = self
                .calendar_hub
                .events()
                .delete(calendar_id, remote_event_id)
                .send_updates("all")
                .doit()
                .await;
            match result.map_err(map_api_error) {
                Ok(_) | Err(ProviderError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
    }

    fn get_event_status<'a>(
        &'a self,
        calendar_id: &'a str,
        remote_event_id: &'a str,
    ) -> BoxFuture<'a, Option<RemoteEventStatus>, ProviderError> {
        Box::pin(async move {
            let result = self
                .calendar_hub
                .events()
                .get(calendar_id, remote_event_id)
                .doit()
                .await
                .map_err(map_api_error);
            match result {
                Ok((_response, event)) => Ok(Some(match event.status.as_deref() {
                    Some("cancelled") => RemoteEventStatus::Cancelled,
                    Some("tentative") => RemoteEventStatus::Tentative,
                    _ => RemoteEventStatus::Confirmed,
                })),
                Err(ProviderError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}
