use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::traits::ExchangeAdapter;
use crate::exchanges::{bybit, trbinance};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds an adapter from configuration.
pub type AdapterFactory =
    Box<dyn Fn(ExchangeConfig) -> Result<Arc<dyn ExchangeAdapter>, ExchangeError> + Send + Sync>;

/// Name-to-factory map, populated at startup and passed to whoever needs
/// exchange lookup.
#[derive(Default)]
pub struct ExchangeRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeRegistry")
            .field("exchanges", &self.names())
            .finish()
    }
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every adapter this crate ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("trbinance", |config| {
            Ok(Arc::new(trbinance::build_connector(config)?) as Arc<dyn ExchangeAdapter>)
        });
        registry.register("bybit", |config| {
            Ok(Arc::new(bybit::build_connector(config, bybit::Category::Spot)?)
                as Arc<dyn ExchangeAdapter>)
        });
        registry.register("bybit_linear", |config| {
            Ok(Arc::new(bybit::build_connector(config, bybit::Category::Linear)?)
                as Arc<dyn ExchangeAdapter>)
        });
        registry.register("bybit_inverse", |config| {
            Ok(Arc::new(bybit::build_connector(config, bybit::Category::Inverse)?)
                as Arc<dyn ExchangeAdapter>)
        });
        registry.register("bybit_option", |config| {
            Ok(Arc::new(bybit::build_connector(config, bybit::Category::Option)?)
                as Arc<dyn ExchangeAdapter>)
        });
        registry
    }

    /// Add or replace the factory for `name` (case-insensitive).
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(ExchangeConfig) -> Result<Arc<dyn ExchangeAdapter>, ExchangeError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(
        &self,
        name: &str,
        config: ExchangeConfig,
    ) -> Result<Arc<dyn ExchangeAdapter>, ExchangeError> {
        let factory = self
            .factories
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| ExchangeError::NotFound(format!("no exchange named '{}'", name)))?;
        factory(config)
    }
}
