use std::fmt;
use thiserror::Error;

/// Errors raised by the meetsync service outside the booking engine: start-up
/// wiring and service-level endpoints such as the health check.
///
/// The engine keeps its own precise error enum and renders it itself.
#[derive(Error, Debug)]
pub enum MeetSyncError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The database cannot be reached or prepared
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An external service could not be initialised
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl MeetSyncError {
    /// Stable machine readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MeetSyncError::ConfigError(_) => "CONFIG_ERROR",
            MeetSyncError::DatabaseError(_) => "DATABASE_UNAVAILABLE",
            MeetSyncError::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            MeetSyncError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for MeetSyncError {
    fn status_code(&self) -> u16 {
        match self {
            MeetSyncError::ConfigError(_) => 500,
            MeetSyncError::DatabaseError(_) => 503,
            MeetSyncError::ExternalServiceError { .. } => 502,
            MeetSyncError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, MeetSyncError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, MeetSyncError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, MeetSyncError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| MeetSyncError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, MeetSyncError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| MeetSyncError::InternalError(format!("{}: {}", f(), error)))
    }
}
