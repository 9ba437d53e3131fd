//! The process-wide dispatch context.
//!
//! Business logic talks to exactly one [`DispatchContext`], shared as an
//! `Arc` from `main`. It is inert until [`DispatchContext::init`] attaches it
//! to a transport host; from then on it owns the active strategy and feeds it
//! connection lifecycle events from the transport.
//!
//! Pre-init calls never fail: they log at error level and do nothing, so a
//! misordered startup surfaces in logs instead of crashing request handlers.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use seatcast_core::{COURSE_UPDATED_EVENT, CourseUpdate};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::catalog::StrategySelection;
use super::fallback::course_update_payload;
use super::strategy::{BoundStrategy, DeliveryStrategy};
use crate::errors::DispatchError;
use crate::metrics::{DISPATCH_EVENTS_TOTAL, DISPATCH_KIND_COURSE_UPDATE, DISPATCH_KIND_GENERIC};
use crate::websocket::{Transport, TransportEvent, TransportHost};

struct Bound {
    transport: Arc<Transport>,
    strategy: BoundStrategy,
}

/// Holds the active strategy and transport once initialized.
pub struct DispatchContext {
    selection: StrategySelection,
    init_lock: Mutex<()>,
    bound: OnceLock<Bound>,
}

impl DispatchContext {
    /// An uninitialized context that will build `selection` on init.
    pub fn new(selection: StrategySelection) -> Self {
        Self {
            selection,
            init_lock: Mutex::new(()),
            bound: OnceLock::new(),
        }
    }

    /// Attach to `host`: create the transport, build the configured strategy
    /// and start routing connection events to it.
    ///
    /// Only the first call has any effect; later calls log a warning and
    /// return `Ok` without touching the new host. Must run inside a Tokio
    /// runtime.
    pub fn init<H>(&self, host: &H) -> Result<(), DispatchError>
    where
        H: TransportHost + ?Sized,
    {
        let _guard = self.init_lock.lock();
        if let Some(bound) = self.bound.get() {
            warn!(
                strategy = bound.strategy.strategy().name(),
                "dispatch context already initialized, ignoring init"
            );
            return Ok(());
        }

        let factory = self.selection.factory()?;
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Transport::new(
            host.transport_config(),
            host.shutdown_token(),
            events_tx,
        ));
        let strategy = factory(Arc::clone(&transport));
        let _ = runtime.spawn(listen(strategy.clone(), events_rx));
        host.attach_transport(Arc::clone(&transport));

        info!(
            key = self.selection.key(),
            strategy = strategy.strategy().name(),
            course_updates = strategy.course_updates().is_some(),
            "dispatch context initialized"
        );
        let _ = self.bound.set(Bound {
            transport,
            strategy,
        });
        Ok(())
    }

    /// Whether [`init`](Self::init) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.bound.get().is_some()
    }

    /// The configured strategy key.
    pub fn strategy_key(&self) -> &str {
        self.selection.key()
    }

    /// The active strategy, if initialized.
    pub fn active_strategy(&self) -> Option<Arc<dyn DeliveryStrategy>> {
        self.bound.get().map(|b| Arc::clone(b.strategy.strategy()))
    }

    /// The transport this context created, if initialized.
    pub fn transport(&self) -> Option<&Arc<Transport>> {
        self.bound.get().map(|b| &b.transport)
    }

    /// Report a course seat change.
    ///
    /// Strategies with a course-update handler get the full update. Others
    /// receive a generic `course_updated` event carrying title, current seats
    /// and course ID.
    pub fn notify_course_update(&self, update: &CourseUpdate) {
        let Some(bound) = self.bound.get() else {
            error!(
                course_id = %update.updated_course.id,
                "dispatch context not initialized, dropping course update"
            );
            return;
        };
        ::metrics::counter!(DISPATCH_EVENTS_TOTAL, "kind" => DISPATCH_KIND_COURSE_UPDATE).increment(1);

        if let Some(handler) = bound.strategy.course_updates() {
            handler.notify_course_update(update);
            return;
        }

        warn!(
            strategy = bound.strategy.strategy().name(),
            "strategy has no course update handler, falling back to generic course_updated"
        );
        let payload = course_update_payload(update);
        bound
            .strategy
            .strategy()
            .distribute_message(COURSE_UPDATED_EVENT, &Value::from(payload));
    }

    /// Send a named event through the active strategy.
    pub fn distribute_message(&self, event_name: &str, data: &Value) {
        let Some(bound) = self.bound.get() else {
            error!(event_name, "dispatch context not initialized, dropping message");
            return;
        };
        ::metrics::counter!(DISPATCH_EVENTS_TOTAL, "kind" => DISPATCH_KIND_GENERIC).increment(1);
        debug!(event_name, "distributing message");
        bound.strategy.strategy().distribute_message(event_name, data);
    }

    /// Identity tags of all currently connected clients (untagged clients
    /// are skipped). Empty before init.
    pub fn active_user_ids(&self) -> Vec<String> {
        let Some(bound) = self.bound.get() else {
            warn!("dispatch context not initialized, no connected clients");
            return Vec::new();
        };
        bound.transport.registry().identities()
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new(StrategySelection::default())
    }
}

async fn listen(strategy: BoundStrategy, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        handle_transport_event(&strategy, event);
    }
    debug!("transport event channel closed");
}

/// Apply one lifecycle event to the strategy.
///
/// The transport has already attached the handshake identity, so the
/// strategy sees a fully tagged connection. The connection is marked
/// registered only after the strategy returns.
fn handle_transport_event(strategy: &BoundStrategy, event: TransportEvent) {
    match event {
        TransportEvent::Connected { connection } => {
            info!(
                conn_id = %connection.id,
                user_id = connection.identity().unwrap_or("-"),
                "client registered"
            );
            strategy.strategy().register_client(Arc::clone(&connection));
            connection.mark_registered();
        }
        TransportEvent::Disconnected { connection_id } => {
            info!(conn_id = %connection_id, "client unregistered");
            strategy.strategy().unregister_client(&connection_id);
        }
    }
}
