//! Exact-match querysets.
//!
//! A [`QuerySet`] is a store plus a list of `field = value` lookups. Building
//! one never queries; only the terminal methods (`get`, `first`, `exists`,
//! `all`, `count`) reach the store, one query each.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use pathconv_core::{PathconvError, PathconvResult};

use crate::model::Model;
use crate::store::{Lookup, ObjectStore};
use crate::value::Value;

/// A lazily evaluated, exact-match query over one model.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use pathconv_db::{Model, QuerySet, InMemoryStore};
/// # async fn demo<M: Model>() -> pathconv_core::PathconvResult<()> {
/// let store = Arc::new(InMemoryStore::new("default"));
/// let qs = QuerySet::<M>::new(store).filter("pk", 12_i64)?;
/// let obj = qs.get().await?;
/// # let _ = obj;
/// # Ok(())
/// # }
/// ```
pub struct QuerySet<M: Model> {
    store: Arc<dyn ObjectStore>,
    lookups: Vec<Lookup>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lookups: self.lookups.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &M::meta().label())
            .field("db", &self.db())
            .field("lookups", &self.lookups)
            .finish()
    }
}

impl<M: Model> QuerySet<M> {
    /// Creates an unfiltered queryset over `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            lookups: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Adds a `field = value` lookup.
    ///
    /// The field is validated against the model metadata; no query runs.
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> PathconvResult<Self> {
        let field = M::meta().resolve_field(field)?;
        self.lookups.push(Lookup {
            field: field.name,
            value: value.into(),
        });
        Ok(self)
    }

    /// Returns the alias of the store this queryset reads from.
    pub fn db(&self) -> &str {
        self.store.alias()
    }

    /// Returns the same lookups against a different store.
    #[must_use]
    pub fn using(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = store;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Returns the accumulated lookups.
    pub fn lookups(&self) -> &[Lookup] {
        &self.lookups
    }

    async fn fetch(&self, limit: Option<usize>) -> PathconvResult<Vec<M>> {
        let rows = self.store.fetch(M::meta(), &self.lookups, limit).await?;
        rows.iter().map(M::from_row).collect()
    }

    /// Returns the single matching record.
    ///
    /// # Errors
    ///
    /// [`PathconvError::DoesNotExist`] when nothing matches,
    /// [`PathconvError::MultipleObjectsReturned`] when more than one does.
    pub async fn get(&self) -> PathconvResult<M> {
        let mut found = self.fetch(Some(2)).await?;
        match found.len() {
            0 => Err(PathconvError::DoesNotExist(format!(
                "{} matching query does not exist.",
                M::meta().label()
            ))),
            1 => Ok(found.remove(0)),
            _ => Err(PathconvError::MultipleObjectsReturned(format!(
                "get() returned more than one {}",
                M::meta().label()
            ))),
        }
    }

    /// Returns the first matching record, if any.
    pub async fn first(&self) -> PathconvResult<Option<M>> {
        Ok(self.fetch(Some(1)).await?.into_iter().next())
    }

    /// Returns `true` if at least one record matches.
    pub async fn exists(&self) -> PathconvResult<bool> {
        let rows = self.store.fetch(M::meta(), &self.lookups, Some(1)).await?;
        Ok(!rows.is_empty())
    }

    /// Returns every matching record.
    pub async fn all(&self) -> PathconvResult<Vec<M>> {
        self.fetch(None).await
    }

    /// Returns the number of matching records.
    pub async fn count(&self) -> PathconvResult<usize> {
        let rows = self.store.fetch(M::meta(), &self.lookups, None).await?;
        Ok(rows.len())
    }
}
