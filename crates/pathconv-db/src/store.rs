//! Object stores.
//!
//! An [`ObjectStore`] answers exact-match lookups against one model's rows.
//! Every [`fetch`](ObjectStore::fetch) call is one query. [`InMemoryStore`]
//! is the built-in backend and counts and logs each query, which is what the
//! lazy-loading guarantees are tested against.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult};

use crate::model::{Model, ModelMeta, Row};
use crate::value::Value;

/// One `field = value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// The canonical field name (never the `"pk"` alias).
    pub field: &'static str,
    /// The value the field must equal.
    pub value: Value,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.field, self.value)
    }
}

/// A source of model rows addressable by a database alias.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The alias this store is registered under (e.g. `"default"`).
    fn alias(&self) -> &str;

    /// Returns the rows of `meta`'s model that satisfy every lookup, at most
    /// `limit` of them.
    async fn fetch(
        &self,
        meta: &'static ModelMeta,
        lookups: &[Lookup],
        limit: Option<usize>,
    ) -> PathconvResult<Vec<Row>>;
}

impl fmt::Debug for dyn ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("alias", &self.alias())
            .finish()
    }
}

/// An in-process store backed by per-model row vectors.
///
/// # Examples
///
/// ```
/// use pathconv_db::store::InMemoryStore;
///
/// let store = InMemoryStore::new("default");
/// assert_eq!(store.query_count(), 0);
/// ```
pub struct InMemoryStore {
    alias: String,
    tables: RwLock<HashMap<String, Vec<Row>>>,
    query_count: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl InMemoryStore {
    /// Creates an empty store registered under `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            tables: RwLock::new(HashMap::new()),
            query_count: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Stores an instance. Does not count as a query.
    pub fn insert<M: Model>(&self, instance: &M) {
        self.insert_row(M::meta(), instance.to_row());
    }

    /// Stores a raw row for `meta`'s model. Does not count as a query.
    pub fn insert_row(&self, meta: &'static ModelMeta, row: Row) {
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tables.entry(meta.label()).or_default().push(row);
    }

    /// Returns how many queries ran since creation or the last reset.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Returns a description of every query since creation or the last reset.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Resets the query counter and log.
    pub fn reset_queries(&self) {
        self.query_count.store(0, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    fn record(&self, meta: &ModelMeta, lookups: &[Lookup], limit: Option<usize>) {
        let mut sql = format!("SELECT {}", meta.label());
        if !lookups.is_empty() {
            let conditions: Vec<String> = lookups.iter().map(ToString::to_string).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        tracing::trace!(store = %self.alias, query = %sql, "query");
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(sql);
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("alias", &self.alias)
            .field("query_count", &self.query_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn alias(&self) -> &str {
        &self.alias
    }

    async fn fetch(
        &self,
        meta: &'static ModelMeta,
        lookups: &[Lookup],
        limit: Option<usize>,
    ) -> PathconvResult<Vec<Row>> {
        for lookup in lookups {
            meta.resolve_field(lookup.field)?;
        }
        self.record(meta, lookups, limit);

        let tables = self
            .tables
            .read()
            .map_err(|e| PathconvError::DatabaseError(format!("store lock poisoned: {e}")))?;
        let Some(rows) = tables.get(&meta.label()) else {
            return Ok(Vec::new());
        };
        let matching = rows
            .iter()
            .filter(|row| {
                lookups
                    .iter()
                    .all(|l| row.value(l.field).is_some_and(|v| *v == l.value))
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }
}
