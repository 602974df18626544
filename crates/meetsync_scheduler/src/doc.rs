// --- File: crates/meetsync_scheduler/src/doc.rs ---
#![cfg(feature = "openapi")]

use meetsync_common::models::{
    AvailableSlot, Booking, BookingStatus, CalendarSyncStatus, Interval, LeadInfo, ProposalView,
    Slot, SlotSyncStatus,
};
use utoipa::OpenApi;

use crate::handlers::{
    AvailabilityQuery, BookRequest, BookingsQuery, CreateSlotRequest, IssueProposalRequest,
    WindowQuery,
};
use crate::proposal::IssuedProposal;
use crate::slot_generator::GenerationReport;
use crate::synchronizer::SyncReport;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::get_availability_handler,
        crate::handlers::book_handler,
        crate::handlers::issue_proposal_handler,
        crate::handlers::revoke_proposal_handler,
        crate::handlers::list_slots_handler,
        crate::handlers::create_slot_handler,
        crate::handlers::generate_slots_handler,
        crate::handlers::cancel_slot_handler,
        crate::handlers::sync_handler,
        crate::handlers::list_bookings_handler,
        crate::handlers::get_booking_handler,
        crate::handlers::cancel_booking_handler
    ),
    components(
        schemas(
            AvailabilityQuery,
            BookRequest,
            BookingsQuery,
            CreateSlotRequest,
            IssueProposalRequest,
            WindowQuery,
            IssuedProposal,
            GenerationReport,
            SyncReport,
            AvailableSlot,
            Booking,
            BookingStatus,
            CalendarSyncStatus,
            Interval,
            LeadInfo,
            ProposalView,
            Slot,
            SlotSyncStatus
        )
    ),
    tags(
        (name = "Meetings", description = "Proposal availability and booking"),
        (name = "Meetings admin", description = "Slot, proposal and booking administration")
    ),
    servers(
        (url = "/api", description = "Meeting API server")
    )
)]
pub struct MeetingApiDoc;
