//! # seatcast-core
//!
//! Shared vocabulary for the seatcast crates:
//!
//! - **Branded IDs**: [`ids::ConnectionId`] as a newtype for type safety
//! - **Events**: [`events::CourseUpdate`] (domain update), the client-facing
//!   [`events::CourseUpdatedPayload`], and the [`events::OutboundEvent`] wire
//!   envelope sent to every WebSocket client
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;

pub use events::{
    COURSE_UPDATED_EVENT, Course, CourseId, CourseUpdate, CourseUpdatedPayload, OutboundEvent,
};
pub use ids::ConnectionId;
