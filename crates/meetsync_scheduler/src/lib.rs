// --- File: crates/meetsync_scheduler/src/lib.rs ---
//! Meeting availability and booking engine.
//!
//! Leaf first: [`working_hours`] turns weekly rules into candidate
//! intervals, [`slot_generator`] stores them as slots, [`synchronizer`]
//! keeps slot state in line with the remote calendar, [`proposal`] hands
//! leads single-use booking links and [`booking`] turns a link into a
//! confirmed meeting.

pub mod booking;
pub mod doc;
pub mod error;
pub mod gcal;
pub mod handlers;
pub mod notifier;
pub mod proposal;
pub mod routes;
pub mod slot_generator;
pub mod synchronizer;
pub mod token;
#[cfg(test)]
mod token_test;
pub mod working_hours;
#[cfg(test)]
mod working_hours_proptest;

pub use booking::BookingEngine;
pub use error::MeetingError;
pub use handlers::MeetingState;
pub use proposal::{IssuedProposal, ProposalIssuer};
pub use slot_generator::{GenerationReport, SlotGenerator};
pub use synchronizer::{CalendarSynchronizer, SyncReport};
pub use token::TokenSigner;
pub use working_hours::{generate_candidate_intervals, WorkingHoursRules};
