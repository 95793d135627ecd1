//! Database aliases.
//!
//! [`Databases`] maps each alias from the `databases` setting to a live
//! [`ObjectStore`]. Converters pick the store for a lookup by alias, and the
//! batching middleware groups proxies by the alias they read from.

use std::collections::BTreeMap;
use std::sync::Arc;

use pathconv_core::settings::{Settings, MEMORY_ENGINE};
use pathconv_core::{PathconvError, PathconvResult};

use crate::store::{InMemoryStore, ObjectStore};

/// The alias every configuration must define.
pub const DEFAULT_DB_ALIAS: &str = "default";

/// Alias to store mapping.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pathconv_db::router::Databases;
/// use pathconv_db::store::InMemoryStore;
///
/// let dbs = Databases::new().with(Arc::new(InMemoryStore::new("default")));
/// assert_eq!(dbs.default_store().unwrap().alias(), "default");
/// ```
#[derive(Debug, Default, Clone)]
pub struct Databases {
    stores: BTreeMap<String, Arc<dyn ObjectStore>>,
}

impl Databases {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one store per configured alias.
    ///
    /// # Errors
    ///
    /// [`PathconvError::ImproperlyConfigured`] when an engine is unknown or
    /// the `default` alias is missing.
    pub fn from_settings(settings: &Settings) -> PathconvResult<Self> {
        if !settings.databases.contains_key(DEFAULT_DB_ALIAS) {
            return Err(PathconvError::ImproperlyConfigured(
                "settings.databases is improperly configured: the 'default' alias is missing"
                    .to_string(),
            ));
        }

        let mut dbs = Self::new();
        for (alias, config) in &settings.databases {
            if config.engine != MEMORY_ENGINE {
                return Err(PathconvError::ImproperlyConfigured(format!(
                    "Database '{alias}' uses unsupported engine '{}'; available: {MEMORY_ENGINE}",
                    config.engine
                )));
            }
            tracing::debug!(alias = %alias, engine = %config.engine, "configured database");
            dbs.insert(Arc::new(InMemoryStore::new(alias.clone())));
        }
        Ok(dbs)
    }

    /// Adds (or replaces) a store under its own alias.
    pub fn insert(&mut self, store: Arc<dyn ObjectStore>) {
        self.stores.insert(store.alias().to_string(), store);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.insert(store);
        self
    }

    /// Returns the store for `alias`.
    pub fn get(&self, alias: &str) -> PathconvResult<Arc<dyn ObjectStore>> {
        self.stores.get(alias).cloned().ok_or_else(|| {
            PathconvError::ImproperlyConfigured(format!(
                "The connection '{alias}' doesn't exist."
            ))
        })
    }

    /// Returns the `default` store.
    pub fn default_store(&self) -> PathconvResult<Arc<dyn ObjectStore>> {
        self.get(DEFAULT_DB_ALIAS)
    }

    /// Returns the configured aliases in sorted order.
    pub fn aliases(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathconv_core::settings::DatabaseSettings;

    #[test]
    fn test_from_default_settings() {
        let dbs = Databases::from_settings(&Settings::default()).unwrap();
        assert_eq!(dbs.aliases(), vec!["default"]);
    }

    #[test]
    fn test_missing_default_alias() {
        let mut settings = Settings::default();
        settings.databases.clear();
        assert!(matches!(
            Databases::from_settings(&settings),
            Err(PathconvError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_unknown_engine() {
        let mut settings = Settings::default();
        settings.databases.insert(
            "replica".to_string(),
            DatabaseSettings {
                engine: "pathconv.db.backends.postgresql".to_string(),
                ..DatabaseSettings::default()
            },
        );
        let err = Databases::from_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("unsupported engine"));
    }

    #[test]
    fn test_get_unknown_alias() {
        let dbs = Databases::new();
        assert!(dbs.get("other").is_err());
    }
}
