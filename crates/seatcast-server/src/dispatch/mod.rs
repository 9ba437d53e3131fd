//! Dispatch: the single active delivery strategy and the context that
//! routes domain events and connection lifecycle into it.

pub mod catalog;
pub mod context;
pub mod fallback;
pub mod strategy;

pub use catalog::{DEFAULT_STRATEGY_KEY, StrategyCatalog, StrategyFactory, StrategySelection};
pub use context::DispatchContext;
pub use fallback::course_update_payload;
pub use strategy::{BoundStrategy, CourseUpdateHandler, DeliveryStrategy};
