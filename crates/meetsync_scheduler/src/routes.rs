// --- File: crates/meetsync_scheduler/src/routes.rs ---
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    book_handler, cancel_booking_handler, cancel_slot_handler, create_slot_handler,
    generate_slots_handler, get_availability_handler, get_booking_handler, issue_proposal_handler,
    list_bookings_handler, list_slots_handler, revoke_proposal_handler, sync_handler,
    MeetingState,
};

/// Public booking endpoints plus the admin surface. Mounted under `/api`;
/// admin routes expect an upstream layer to have authenticated the caller.
pub fn routes(state: Arc<MeetingState>) -> Router {
    Router::new()
        .route("/meetings/availability", get(get_availability_handler))
        .route("/meetings/book", post(book_handler))
        .route("/admin/meetings/proposals", post(issue_proposal_handler))
        .route(
            "/admin/meetings/proposals/{token}",
            delete(revoke_proposal_handler),
        )
        .route(
            "/admin/meetings/slots",
            get(list_slots_handler).post(create_slot_handler),
        )
        .route("/admin/meetings/slots/generate", post(generate_slots_handler))
        .route("/admin/meetings/slots/{id}/cancel", post(cancel_slot_handler))
        .route("/admin/meetings/sync", post(sync_handler))
        .route("/admin/meetings/bookings", get(list_bookings_handler))
        .route("/admin/meetings/bookings/{id}", get(get_booking_handler))
        .route(
            "/admin/meetings/bookings/{id}/cancel",
            post(cancel_booking_handler),
        )
        .with_state(state)
}
