//! Observer strategy: clients subscribe on connect and receive full course
//! updates, including the previous seat count.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use seatcast_core::{COURSE_UPDATED_EVENT, ConnectionId, CourseUpdate, OutboundEvent};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::dispatch::{CourseUpdateHandler, DeliveryStrategy};
use crate::websocket::ClientConnection;
use crate::websocket::registry::fan_out;

/// Sent to identified observers when a fully booked course reopens.
pub const SEATS_AVAILABLE_EVENT: &str = "seats_available";

/// Keeps its own observer list, filled by `register_client`.
#[derive(Default)]
pub struct ObserverStrategy {
    observers: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ObserverStrategy {
    /// Catalog key.
    pub const KEY: &'static str = "observer";

    /// Strategy with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribed clients.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

impl DeliveryStrategy for ObserverStrategy {
    fn name(&self) -> &str {
        Self::KEY
    }

    fn register_client(&self, connection: Arc<ClientConnection>) {
        debug!(conn_id = %connection.id, "observer subscribed");
        let _ = self
            .observers
            .write()
            .insert(connection.id.clone(), connection);
    }

    fn unregister_client(&self, connection_id: &ConnectionId) {
        if self.observers.write().remove(connection_id).is_some() {
            debug!(conn_id = %connection_id, "observer unsubscribed");
        }
    }

    fn distribute_message(&self, event_name: &str, data: &Value) {
        let event = OutboundEvent::new(event_name, data.clone());
        let observers = self.observers.read();
        let _ = fan_out(observers.values(), &event);
    }
}

impl CourseUpdateHandler for ObserverStrategy {
    fn notify_course_update(&self, update: &CourseUpdate) {
        let course = &update.updated_course;
        let event = OutboundEvent::new(
            COURSE_UPDATED_EVENT,
            json!({
                "courseId": course.id,
                "courseTitle": course.title,
                "seatsAvailable": update.new_spots,
                "previousSeats": update.old_spots,
            }),
        );
        let observers = self.observers.read();
        let delivered = fan_out(observers.values(), &event);

        if update.reopened() {
            let reopened = OutboundEvent::new(
                SEATS_AVAILABLE_EVENT,
                json!({
                    "courseId": course.id,
                    "courseTitle": course.title,
                    "seatsAvailable": update.new_spots,
                }),
            );
            let notified = fan_out(
                observers.values().filter(|c| c.identity().is_some()),
                &reopened,
            );
            info!(course_id = %course.id, notified, "course reopened");
        }
        debug!(course_id = %course.id, delivered, "course update delivered to observers");
    }
}
