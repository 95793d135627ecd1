//! Batch loaders.
//!
//! A [`BatchLoader`] groups unresolved lazy objects that read from the same
//! database so they can be fetched together. Grouping never queries.
//!
//! Loaders hold their items weakly while each item holds its loader strongly,
//! so a loader lives exactly as long as one of its objects does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::lazy::{AnyLazyObject, ObjectRef};

/// Unresolved lazy objects sharing one database alias.
pub struct BatchLoader {
    db: String,
    items: Mutex<Vec<Weak<dyn AnyLazyObject>>>,
}

impl BatchLoader {
    /// Creates an empty loader for `db`.
    pub fn new(db: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            items: Mutex::new(Vec::new()),
        }
    }

    /// Returns the database alias.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Adds an object. Adding the same object twice is a no-op.
    ///
    /// Returns `true` if the object was added.
    pub fn add(&self, obj: &ObjectRef) -> bool {
        let target = Arc::as_ptr(obj).cast::<()>();
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.retain(|w| w.strong_count() > 0);
        if items.iter().any(|w| w.as_ptr().cast::<()>() == target) {
            return false;
        }
        items.push(Arc::downgrade(obj));
        true
    }

    /// Returns the live objects in insertion order.
    pub fn items(&self) -> Vec<ObjectRef> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Returns the objects a batch fetch would still load: live, unresolved
    /// and not forked.
    pub fn pending(&self) -> Vec<ObjectRef> {
        self.items()
            .into_iter()
            .filter(|obj| !obj.is_resolved() && !obj.is_forked())
            .collect()
    }

    /// Returns the number of live objects.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Returns `true` if no live object remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLoader")
            .field("db", &self.db)
            .field("len", &self.len())
            .finish()
    }
}

/// Per-request registry of batch loaders, one per database alias.
#[derive(Debug, Default)]
pub struct BatchLoaderManager {
    loaders: BTreeMap<String, Arc<BatchLoader>>,
}

impl BatchLoaderManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the loader for `db`, creating it if needed.
    pub fn loader(&mut self, db: &str) -> Arc<BatchLoader> {
        Arc::clone(
            self.loaders
                .entry(db.to_string())
                .or_insert_with(|| Arc::new(BatchLoader::new(db))),
        )
    }

    /// Registers `loader` under its alias.
    ///
    /// When a loader for that alias already exists, the new loader's objects
    /// are moved into it and re-attached, and the existing loader is returned.
    pub fn insert(&mut self, loader: Arc<BatchLoader>) -> Arc<BatchLoader> {
        match self.loaders.get(loader.db()) {
            Some(existing) if !Arc::ptr_eq(existing, &loader) => {
                for obj in loader.items() {
                    existing.add(&obj);
                    obj.set_batch_loader(Arc::clone(existing));
                }
                Arc::clone(existing)
            }
            Some(existing) => Arc::clone(existing),
            None => {
                self.loaders
                    .insert(loader.db().to_string(), Arc::clone(&loader));
                loader
            }
        }
    }

    /// Returns every loader, sorted by alias.
    pub fn loaders(&self) -> Vec<Arc<BatchLoader>> {
        self.loaders.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy::LazyObject;
    use crate::model::{FieldDef, FieldKind, Model, ModelMeta, Row};
    use crate::queryset::QuerySet;
    use crate::store::{InMemoryStore, ObjectStore};
    use crate::value::Value;
    use pathconv_core::PathconvResult;

    static TAG: ModelMeta = ModelMeta {
        app_label: "blog",
        model_name: "tag",
        pk_field: "id",
        fields: &[FieldDef::new("id", FieldKind::Int)],
    };

    #[derive(Debug)]
    struct Tag {
        id: i64,
    }

    impl Model for Tag {
        fn meta() -> &'static ModelMeta {
            &TAG
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::Int(self.id))]
        }

        fn from_row(row: &Row) -> PathconvResult<Self> {
            Ok(Self { id: row.get("id")? })
        }
    }

    fn tag(store: &Arc<InMemoryStore>, id: i64) -> ObjectRef {
        let store: Arc<dyn ObjectStore> = store.clone();
        Arc::new(LazyObject::<Tag>::new(QuerySet::new(store), "pk", id))
    }

    #[test]
    fn test_add_dedupes_by_identity() {
        let store = Arc::new(InMemoryStore::new("default"));
        let loader = BatchLoader::new("default");
        let a = tag(&store, 1);
        let b = tag(&store, 1);
        assert!(loader.add(&a));
        assert!(!loader.add(&a));
        assert!(loader.add(&b));
        assert_eq!(loader.len(), 2);
        assert_eq!(store.query_count(), 0);
    }

    #[test]
    fn test_items_are_weak() {
        let store = Arc::new(InMemoryStore::new("default"));
        let loader = Arc::new(BatchLoader::new("default"));
        {
            let a = tag(&store, 1);
            loader.add(&a);
            a.set_batch_loader(Arc::clone(&loader));
            assert_eq!(loader.len(), 1);
        }
        assert!(loader.is_empty());
        assert_eq!(Arc::strong_count(&loader), 1);
    }

    #[tokio::test]
    async fn test_pending_skips_resolved_and_forked() {
        let store = Arc::new(InMemoryStore::new("default"));
        store.insert(&Tag { id: 1 });
        let loader = BatchLoader::new("default");
        let a = tag(&store, 1);
        let b = tag(&store, 2);
        let c = tag(&store, 3);
        for obj in [&a, &b, &c] {
            loader.add(obj);
        }

        a.resolve().await.unwrap();
        let _fork = b.downcast_ref::<Tag>().unwrap().with_queryset(None);

        let pending = loader.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key(), &Value::Int(3));
    }

    #[test]
    fn test_manager_get_or_create() {
        let mut manager = BatchLoaderManager::new();
        let a = manager.loader("default");
        let b = manager.loader("default");
        let c = manager.loader("replica");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        let dbs: Vec<String> = manager.loaders().iter().map(|l| l.db().to_string()).collect();
        assert_eq!(dbs, vec!["default", "replica"]);
    }

    #[test]
    fn test_manager_insert_merges() {
        let store = Arc::new(InMemoryStore::new("default"));
        let mut manager = BatchLoaderManager::new();
        let existing = manager.loader("default");
        let x = tag(&store, 1);
        existing.add(&x);

        let other = Arc::new(BatchLoader::new("default"));
        let y = tag(&store, 2);
        other.add(&y);
        y.set_batch_loader(Arc::clone(&other));

        let merged = manager.insert(other);
        assert!(Arc::ptr_eq(&merged, &existing));
        assert_eq!(existing.len(), 2);
        assert!(Arc::ptr_eq(&y.batch_loader().unwrap(), &existing));
    }
}
