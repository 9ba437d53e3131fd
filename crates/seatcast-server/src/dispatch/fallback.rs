//! Course update flattening for strategies without a course-update handler.

use seatcast_core::{CourseUpdate, CourseUpdatedPayload};

/// Reduce a [`CourseUpdate`] to what every client can render: title, current
/// free seats and course ID. The previous seat count is not carried.
pub fn course_update_payload(update: &CourseUpdate) -> CourseUpdatedPayload {
    CourseUpdatedPayload {
        course_title: update.updated_course.title.clone(),
        seats_available: update.new_spots,
        course_id: update.updated_course.id.clone(),
    }
}
