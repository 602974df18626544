// --- File: crates/meetsync_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Domain model shared by every crate
pub mod retry; // Bounded retry with exponential backoff
pub mod services; // Calendar provider and notifier abstractions
pub mod store; // Transactional store abstraction
#[cfg(test)]
mod retry_test;

pub use error::{Context, HttpStatusCode, MeetSyncError};

pub use http::{
    client::{create_client, HTTP_CLIENT},
    json_error,
};

pub use logging::{init, init_with_level, log_result};

pub use retry::{RetryPolicy, Retryable};

pub use services::{
    BoxFuture, CalendarProvider, CreatedEvent, EventKind, NewCalendarEvent, Notifier,
    NotifierError, ProviderError, RemoteEventStatus,
};

pub use store::{memory::MemoryStore, BookingFilter, ClaimOutcome, ClaimRequest, SlotTransition, Store, StoreError};
