//! Domain update events and the client wire envelope.
//!
//! Business logic produces [`CourseUpdate`] values. Strategies that know how to
//! filter by course state consume them directly; everyone else receives the
//! flattened [`CourseUpdatedPayload`] under [`COURSE_UPDATED_EVENT`].

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Event name clients receive whenever a course's seat count changed.
pub const COURSE_UPDATED_EVENT: &str = "course_updated";

/// Course identifier as stored upstream: numeric database keys and string
/// slugs both occur.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourseId {
    /// Numeric primary key.
    Number(i64),
    /// String key.
    Text(String),
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CourseId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for CourseId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for CourseId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Snapshot of a course after an update.
///
/// Only `id` and `title` are interpreted here; every other field the
/// upstream entity carries (trainer, schedule, capacity, ...) is preserved in
/// `extra` so specialized strategies can use it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Course identifier.
    pub id: CourseId,
    /// Human-readable title.
    pub title: String,
    /// Remaining upstream fields, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    /// Course with no extra fields.
    pub fn new(id: impl Into<CourseId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            extra: Map::new(),
        }
    }
}

/// A change in the number of free seats of one course.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    /// The course after the change.
    pub updated_course: Course,
    /// Free seats before the change.
    pub old_spots: u32,
    /// Free seats after the change.
    pub new_spots: u32,
}

impl CourseUpdate {
    /// Whether a fully booked course just got seats back.
    pub fn reopened(&self) -> bool {
        self.old_spots == 0 && self.new_spots > 0
    }
}

/// Client-shaped payload of a [`COURSE_UPDATED_EVENT`]: current state only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdatedPayload {
    /// Title of the course.
    pub course_title: String,
    /// Free seats right now.
    pub seats_available: u32,
    /// Course identifier.
    pub course_id: CourseId,
}

impl From<CourseUpdatedPayload> for Value {
    fn from(payload: CourseUpdatedPayload) -> Self {
        json!({
            "courseTitle": payload.course_title,
            "seatsAvailable": payload.seats_available,
            "courseId": payload.course_id,
        })
    }
}

/// Envelope for every frame pushed to a client.
///
/// ```json
/// {"type": "course_updated", "timestamp": "2026-01-01T00:00:00.000Z", "data": {...}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Event name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// RFC 3339 creation time, millisecond precision.
    pub timestamp: String,
    /// Event payload.
    pub data: Value,
}

impl OutboundEvent {
    /// Wrap a payload, stamping the current time.
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data,
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
