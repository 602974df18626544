// --- File: crates/meetsync_scheduler/src/handlers.rs ---
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Duration, Utc};
use meetsync_common::models::{Booking, BookingStatus, ProposalView, Slot};
use meetsync_common::{BookingFilter, Store};
use meetsync_config::AppConfig;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::booking::BookingEngine;
use crate::error::MeetingError;
use crate::proposal::{IssuedProposal, ProposalIssuer};
use crate::slot_generator::{GenerationReport, SlotGenerator};
use crate::synchronizer::{CalendarSynchronizer, SyncReport};

/// Everything the meeting endpoints need, built once at start-up.
#[derive(Clone)]
pub struct MeetingState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub proposals: Arc<ProposalIssuer>,
    pub bookings: Arc<BookingEngine>,
    pub generator: Arc<SlotGenerator>,
    pub synchronizer: Arc<CalendarSynchronizer>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub token: String,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub token: String,
    pub slot_id: Uuid,
    pub agenda: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct IssueProposalRequest {
    pub lead_id: String,
    pub slot_ids: Vec<Uuid>,
    /// Falls back to `proposals.default_ttl_hours`.
    pub ttl_hours: Option<i64>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Falls back to `working_hours.default_capacity`.
    pub capacity: Option<u32>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<BookingStatus>,
    pub slot_id: Option<Uuid>,
}

impl MeetingState {
    /// `[from, to)` with the generator's rolling horizon filling the gaps.
    fn window(&self, query: &WindowQuery) -> Result<(DateTime<Utc>, DateTime<Utc>), MeetingError> {
        let (default_from, default_to) = self.generator.default_window(Utc::now());
        let from = query.from.unwrap_or(default_from);
        let to = query.to.unwrap_or(default_to);
        if to <= from {
            return Err(MeetingError::Validation(
                "`to` must be after `from`".to_string(),
            ));
        }
        Ok((from, to))
    }
}

/// Live availability behind a booking link.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/meetings/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Bookable slots of the proposal", body = ProposalView),
        (status = 404, description = "Unknown token"),
        (status = 410, description = "Token expired, used or revoked")
    ),
    tag = "Meetings"
))]
pub async fn get_availability_handler(
    State(state): State<Arc<MeetingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ProposalView>, MeetingError> {
    let view = state.proposals.redeem(&query.token).await?;
    debug!(slots = view.total_slots, "Availability served");
    Ok(Json(view))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/meetings/book",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Booking confirmed", body = Booking),
        (status = 400, description = "Slot is not part of the proposal"),
        (status = 409, description = "Slot no longer available"),
        (status = 410, description = "Token expired, used or revoked"),
        (status = 502, description = "Calendar event could not be created")
    ),
    tag = "Meetings"
))]
pub async fn book_handler(
    State(state): State<Arc<MeetingState>>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<Booking>), MeetingError> {
    let booking = state
        .bookings
        .book(&request.token, request.slot_id, request.agenda)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/proposals",
    request_body = IssueProposalRequest,
    responses(
        (status = 201, description = "Proposal issued", body = IssuedProposal),
        (status = 400, description = "Invalid slot set or lifetime"),
        (status = 404, description = "Unknown lead")
    ),
    tag = "Meetings admin"
))]
pub async fn issue_proposal_handler(
    State(state): State<Arc<MeetingState>>,
    Json(request): Json<IssueProposalRequest>,
) -> Result<(StatusCode, Json<IssuedProposal>), MeetingError> {
    let ttl_hours = request
        .ttl_hours
        .unwrap_or(state.config.proposals.default_ttl_hours);
    let issued = state
        .proposals
        .issue(&request.lead_id, &request.slot_ids, Duration::hours(ttl_hours))
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/admin/meetings/proposals/{token}",
    params(("token" = String, Path, description = "Proposal token")),
    responses(
        (status = 204, description = "Proposal revoked"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Proposal is no longer active")
    ),
    tag = "Meetings admin"
))]
pub async fn revoke_proposal_handler(
    State(state): State<Arc<MeetingState>>,
    Path(token): Path<String>,
) -> Result<StatusCode, MeetingError> {
    state.proposals.revoke(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/meetings/slots",
    params(WindowQuery),
    responses((status = 200, description = "Slots in the window", body = [Slot])),
    tag = "Meetings admin"
))]
pub async fn list_slots_handler(
    State(state): State<Arc<MeetingState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<Slot>>, MeetingError> {
    let (from, to) = state.window(&query)?;
    Ok(Json(state.store.list_slots(from, to).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/slots",
    request_body = CreateSlotRequest,
    responses(
        (status = 201, description = "Slot added", body = Slot),
        (status = 400, description = "Invalid interval or capacity"),
        (status = 409, description = "A slot with this interval exists")
    ),
    tag = "Meetings admin"
))]
pub async fn create_slot_handler(
    State(state): State<Arc<MeetingState>>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Slot>), MeetingError> {
    let slot = state
        .generator
        .add_slot(request.start_time, request.end_time, request.capacity, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/slots/generate",
    params(WindowQuery),
    responses((status = 200, description = "Generation result", body = GenerationReport)),
    tag = "Meetings admin"
))]
pub async fn generate_slots_handler(
    State(state): State<Arc<MeetingState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<GenerationReport>, MeetingError> {
    let (from, to) = state.window(&query)?;
    let report = state.generator.generate(from, to, Utc::now()).await?;
    Ok(Json(report))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/slots/{id}/cancel",
    params(("id" = Uuid, Path, description = "Slot id")),
    responses(
        (status = 200, description = "Slot cancelled", body = Slot),
        (status = 404, description = "Unknown slot"),
        (status = 409, description = "Slot already cancelled")
    ),
    tag = "Meetings admin"
))]
pub async fn cancel_slot_handler(
    State(state): State<Arc<MeetingState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Slot>, MeetingError> {
    Ok(Json(state.synchronizer.cancel_slot(id, Utc::now()).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/sync",
    responses((status = 200, description = "Result of one sync pass", body = SyncReport)),
    tag = "Meetings admin"
))]
pub async fn sync_handler(
    State(state): State<Arc<MeetingState>>,
) -> Result<Json<SyncReport>, MeetingError> {
    Ok(Json(state.synchronizer.run_pass(Utc::now()).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/meetings/bookings",
    params(BookingsQuery),
    responses((status = 200, description = "Bookings in creation order", body = [Booking])),
    tag = "Meetings admin"
))]
pub async fn list_bookings_handler(
    State(state): State<Arc<MeetingState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, MeetingError> {
    let filter = BookingFilter {
        status: query.status,
        slot_id: query.slot_id,
    };
    Ok(Json(state.store.list_bookings(filter).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/meetings/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 404, description = "Unknown booking")
    ),
    tag = "Meetings admin"
))]
pub async fn get_booking_handler(
    State(state): State<Arc<MeetingState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, MeetingError> {
    Ok(Json(state.bookings.get_booking(id).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/meetings/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 404, description = "Unknown booking"),
        (status = 409, description = "Booking is not confirmed")
    ),
    tag = "Meetings admin"
))]
pub async fn cancel_booking_handler(
    State(state): State<Arc<MeetingState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, MeetingError> {
    Ok(Json(state.bookings.cancel_booking(id).await?))
}
