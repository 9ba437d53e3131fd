//! The delivery strategy contract.

use std::sync::Arc;

use seatcast_core::{ConnectionId, CourseUpdate};
use serde_json::Value;

use crate::websocket::ClientConnection;

/// A pluggable policy deciding which connected clients receive which events.
///
/// Exactly one strategy is active per process. The dispatch context calls
/// `register_client` once per admitted connection (identity already
/// attached), `unregister_client` once when it leaves, and
/// `distribute_message` for every generic event. Implementations must be
/// callable from any task and must not block.
pub trait DeliveryStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Start tracking a newly connected client.
    fn register_client(&self, connection: Arc<ClientConnection>);

    /// Stop tracking a client that disconnected.
    fn unregister_client(&self, connection_id: &ConnectionId);

    /// Deliver `data` under `event_name` to the clients this strategy selects.
    fn distribute_message(&self, event_name: &str, data: &Value);
}

/// Optional capability: react to full course updates instead of the
/// flattened `course_updated` fallback.
pub trait CourseUpdateHandler: Send + Sync {
    /// Handle one course update.
    fn notify_course_update(&self, update: &CourseUpdate);
}

/// The active strategy together with its optional course-update capability.
///
/// Capability is declared when the strategy is constructed, so the dispatch
/// context never has to inspect the strategy at call time.
#[derive(Clone)]
pub struct BoundStrategy {
    strategy: Arc<dyn DeliveryStrategy>,
    course_updates: Option<Arc<dyn CourseUpdateHandler>>,
}

impl BoundStrategy {
    /// A strategy that only understands generic events.
    pub fn generic<S>(strategy: Arc<S>) -> Self
    where
        S: DeliveryStrategy + 'static,
    {
        Self {
            strategy,
            course_updates: None,
        }
    }

    /// A strategy that also handles course updates itself.
    pub fn with_course_updates<S>(strategy: Arc<S>) -> Self
    where
        S: DeliveryStrategy + CourseUpdateHandler + 'static,
    {
        Self {
            strategy: strategy.clone(),
            course_updates: Some(strategy),
        }
    }

    /// The generic strategy interface.
    pub fn strategy(&self) -> &Arc<dyn DeliveryStrategy> {
        &self.strategy
    }

    /// The course-update handler, if the strategy declared one.
    pub fn course_updates(&self) -> Option<&Arc<dyn CourseUpdateHandler>> {
        self.course_updates.as_ref()
    }
}

impl std::fmt::Debug for BoundStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStrategy")
            .field("name", &self.strategy.name())
            .field("course_updates", &self.course_updates.is_some())
            .finish()
    }
}
