//! Built-in delivery strategies.

pub mod broadcast;
pub mod observer;

pub use broadcast::BroadcastStrategy;
pub use observer::ObserverStrategy;
