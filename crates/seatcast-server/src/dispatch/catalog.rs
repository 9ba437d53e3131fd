//! Strategy catalog: configuration keys mapped to strategy constructors.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::DispatchError;
use crate::strategies::{BroadcastStrategy, ObserverStrategy};
use crate::websocket::Transport;

use super::strategy::BoundStrategy;

/// Key selected when configuration names no strategy.
pub const DEFAULT_STRATEGY_KEY: &str = ObserverStrategy::KEY;

/// Builds a strategy bound to the transport it will deliver through.
pub type StrategyFactory = Arc<dyn Fn(Arc<Transport>) -> BoundStrategy + Send + Sync>;

/// Known strategies by key.
#[derive(Clone, Default)]
pub struct StrategyCatalog {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in `broadcast` and `observer` strategies.
    pub fn builtin() -> Self {
        Self::new()
            .with(BroadcastStrategy::KEY, |transport| {
                BoundStrategy::generic(Arc::new(BroadcastStrategy::new(transport)))
            })
            .with(ObserverStrategy::KEY, |_transport| {
                BoundStrategy::with_course_updates(Arc::new(ObserverStrategy::new()))
            })
    }

    /// Register (or replace) a factory under `key`.
    #[must_use]
    pub fn with<F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Arc<Transport>) -> BoundStrategy + Send + Sync + 'static,
    {
        let _ = self.factories.insert(key.into(), Arc::new(factory));
        self
    }

    /// Find the factory for `key`.
    pub fn resolve(&self, key: &str) -> Result<StrategyFactory, DispatchError> {
        self.factories
            .get(key)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownStrategy {
                key: key.to_owned(),
                available: self.keys().join(", "),
            })
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// The strategy a process is configured to use.
#[derive(Clone, Debug)]
pub struct StrategySelection {
    key: String,
    catalog: StrategyCatalog,
}

impl StrategySelection {
    /// Select `key` from `catalog`. Resolution happens at init time.
    pub fn new(key: impl Into<String>, catalog: StrategyCatalog) -> Self {
        Self {
            key: key.into(),
            catalog,
        }
    }

    /// Select `key` from the built-in catalog.
    pub fn builtin(key: impl Into<String>) -> Self {
        Self::new(key, StrategyCatalog::builtin())
    }

    /// Configured key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve the configured key.
    pub fn factory(&self) -> Result<StrategyFactory, DispatchError> {
        self.catalog.resolve(&self.key)
    }
}

impl Default for StrategySelection {
    fn default() -> Self {
        Self::builtin(DEFAULT_STRATEGY_KEY)
    }
}
