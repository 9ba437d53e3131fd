//! # seatcast-server
//!
//! Real-time fan-out of course-seat notifications to WebSocket clients.
//!
//! - [`dispatch`]: the process-wide [`DispatchContext`] that binds one
//!   delivery strategy, registers clients and routes domain events
//! - [`strategies`]: built-in delivery strategies (`broadcast`, `observer`)
//! - [`websocket`]: transport layer (connection registry, upgrade handler,
//!   per-connection session loop)
//! - [`server`]: Axum HTTP server hosting `/ws`, `/health`, `/metrics` and the
//!   notify API used by business logic
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod strategies;
pub mod websocket;

pub use dispatch::{
    BoundStrategy, CourseUpdateHandler, DeliveryStrategy, DispatchContext, StrategyCatalog,
    StrategySelection,
};
pub use errors::{DispatchError, ServerError};
pub use server::HttpServer;
