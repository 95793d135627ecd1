//! Lazily loaded model objects.
//!
//! A [`LazyObject`] stands in for a model record that a URL fragment named.
//! Building one never queries. The first [`get`](LazyObject::get) runs exactly
//! one query and caches the record; later calls hit the cache. Everything
//! that identifies the object (model, database alias, key) is available
//! without resolving it.
//!
//! Views receive proxies type-erased as [`ObjectRef`]s and recover the typed
//! proxy with [`downcast`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult};
use tokio::sync::OnceCell;

use crate::batch::BatchLoader;
use crate::model::{Model, ModelMeta};
use crate::queryset::QuerySet;
use crate::value::Value;

/// A proxy for one model record, resolved on first access.
///
/// # Examples
///
/// ```no_run
/// # use pathconv_db::{LazyObject, Model, QuerySet};
/// # async fn demo<M: Model>(qs: QuerySet<M>) -> pathconv_core::PathconvResult<()> {
/// let user = LazyObject::new(qs, "pk", 12_i64);
/// assert!(!user.is_resolved());
/// let record = user.get().await?; // one query
/// let again = user.get().await?;  // cached
/// # let _ = (record, again);
/// # Ok(())
/// # }
/// ```
pub struct LazyObject<M: Model> {
    queryset: QuerySet<M>,
    key_field: String,
    key: Value,
    forked: AtomicBool,
    batch_loader: Mutex<Option<Arc<BatchLoader>>>,
    cell: OnceCell<M>,
}

impl<M: Model> LazyObject<M> {
    /// Creates an unresolved proxy for the record whose `key_field` equals
    /// `key`. Performs no query and no validation.
    pub fn new(queryset: QuerySet<M>, key_field: impl Into<String>, key: impl Into<Value>) -> Self {
        Self {
            queryset,
            key_field: key_field.into(),
            key: key.into(),
            forked: AtomicBool::new(false),
            batch_loader: Mutex::new(None),
            cell: OnceCell::new(),
        }
    }

    /// Creates an already resolved proxy around a loaded record.
    pub fn from_instance(queryset: QuerySet<M>, key_field: impl Into<String>, instance: M) -> Self {
        let key_field = key_field.into();
        let key = instance.field_value(&key_field).unwrap_or(Value::Null);
        Self {
            queryset,
            key_field,
            key,
            forked: AtomicBool::new(false),
            batch_loader: Mutex::new(None),
            cell: OnceCell::new_with(Some(instance)),
        }
    }

    /// Validates the key field against the model metadata. Never queries.
    pub fn check_field(&self) -> PathconvResult<()> {
        M::meta().resolve_field(&self.key_field).map(|_| ())
    }

    /// Returns the record, querying for it on the first call only.
    ///
    /// # Errors
    ///
    /// [`PathconvError::NotFound`] when no record has the key, a
    /// [`PathconvError::FieldError`] when the key field does not exist.
    pub async fn get(&self) -> PathconvResult<&M> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!(
                    model = %M::meta().label(),
                    db = %self.db(),
                    key_field = %self.key_field,
                    key = %self.key,
                    "resolving lazy object"
                );
                let qs = self.queryset.clone().filter(&self.key_field, self.key.clone())?;
                qs.get().await.map_err(|e| match e {
                    PathconvError::DoesNotExist(msg) => PathconvError::NotFound(msg),
                    other => other,
                })
            })
            .await
    }

    /// Returns the record if it was already loaded.
    pub fn instance(&self) -> Option<&M> {
        self.cell.get()
    }

    /// Returns `true` once the record has been loaded.
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the model metadata. Never queries.
    pub fn model_meta(&self) -> &'static ModelMeta {
        M::meta()
    }

    /// Returns the alias of the store the record is read from.
    pub fn db(&self) -> &str {
        self.queryset.db()
    }

    /// Returns the lookup field as given (may be the `"pk"` alias).
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Returns the lookup value.
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Returns the primary key without querying, when the lookup is by
    /// primary key.
    pub fn pk(&self) -> Option<&Value> {
        M::meta().is_pk(&self.key_field).then_some(&self.key)
    }

    /// Returns the queryset lookups run against.
    pub fn queryset(&self) -> &QuerySet<M> {
        &self.queryset
    }

    /// Returns `true` if the proxied model is `T`. Never queries.
    pub fn is_instance_of<T: Model>(&self) -> bool {
        TypeId::of::<T>() == TypeId::of::<M>()
    }

    /// Returns a fresh, unresolved proxy for the same key, reading from
    /// `queryset` (or this proxy's queryset when `None`).
    ///
    /// The new proxy shares this proxy's batch loader. This proxy is marked as
    /// forked so batch loading skips it; its own key and any loaded record
    /// are left untouched.
    #[must_use]
    pub fn with_queryset(&self, queryset: Option<QuerySet<M>>) -> Self {
        self.forked.store(true, Ordering::SeqCst);
        let forked = Self::new(
            queryset.unwrap_or_else(|| self.queryset.clone()),
            self.key_field.clone(),
            self.key.clone(),
        );
        if let Some(loader) = self.loader() {
            forked.attach(loader);
        }
        forked
    }

    /// Returns `true` once [`with_queryset`](Self::with_queryset) was called.
    pub fn is_forked(&self) -> bool {
        self.forked.load(Ordering::SeqCst)
    }

    fn loader(&self) -> Option<Arc<BatchLoader>> {
        self.batch_loader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn attach(&self, loader: Arc<BatchLoader>) {
        *self
            .batch_loader
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(loader);
    }
}

impl<M: Model> fmt::Debug for LazyObject<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyObject")
            .field("model", &M::meta().label())
            .field("db", &self.db())
            .field("key_field", &self.key_field)
            .field("key", &self.key)
            .field("resolved", &self.is_resolved())
            .field("forked", &self.is_forked())
            .finish()
    }
}

/// The object-safe view of a [`LazyObject`].
#[async_trait]
pub trait AnyLazyObject: Any + Send + Sync + fmt::Debug {
    /// Returns the model metadata.
    fn model_meta(&self) -> &'static ModelMeta;

    /// Returns the `TypeId` of the proxied model type.
    fn model_type(&self) -> TypeId;

    /// Returns the database alias.
    fn db(&self) -> &str;

    /// Returns the lookup field.
    fn key_field(&self) -> &str;

    /// Returns the lookup value.
    fn key(&self) -> &Value;

    /// Returns the primary key if it is known without querying: either the
    /// lookup is by primary key or the record is already loaded.
    fn pk_value(&self) -> Option<Value>;

    /// Returns the value of `field` if it is known without querying.
    fn known_field_value(&self, field: &str) -> Option<Value>;

    /// Returns `true` once the record has been loaded.
    fn is_resolved(&self) -> bool;

    /// Returns `true` once the proxy has been forked.
    fn is_forked(&self) -> bool;

    /// Returns the batch loader this proxy belongs to.
    fn batch_loader(&self) -> Option<Arc<BatchLoader>>;

    /// Attaches the proxy to a batch loader.
    fn set_batch_loader(&self, loader: Arc<BatchLoader>);

    /// Loads the record if needed.
    async fn resolve(&self) -> PathconvResult<()>;

    /// Upcasts for downcasting by reference.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts for downcasting an `Arc`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[async_trait]
impl<M: Model> AnyLazyObject for LazyObject<M> {
    fn model_meta(&self) -> &'static ModelMeta {
        M::meta()
    }

    fn model_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn db(&self) -> &str {
        Self::db(self)
    }

    fn key_field(&self) -> &str {
        &self.key_field
    }

    fn key(&self) -> &Value {
        &self.key
    }

    fn pk_value(&self) -> Option<Value> {
        self.known_field_value(M::meta().pk_field)
    }

    fn known_field_value(&self, field: &str) -> Option<Value> {
        let meta = M::meta();
        let wanted = meta.field(field)?.name;
        if meta.field(&self.key_field).is_some_and(|f| f.name == wanted) {
            return Some(self.key.clone());
        }
        self.instance().and_then(|m| m.field_value(wanted))
    }

    fn is_resolved(&self) -> bool {
        Self::is_resolved(self)
    }

    fn is_forked(&self) -> bool {
        Self::is_forked(self)
    }

    fn batch_loader(&self) -> Option<Arc<BatchLoader>> {
        self.loader()
    }

    fn set_batch_loader(&self, loader: Arc<BatchLoader>) {
        self.attach(loader);
    }

    async fn resolve(&self) -> PathconvResult<()> {
        self.get().await.map(|_| ())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A shared, type-erased lazy object.
pub type ObjectRef = Arc<dyn AnyLazyObject>;

impl dyn AnyLazyObject {
    /// Returns `true` if the proxied model is `M`. Never queries.
    pub fn is_instance<M: Model>(&self) -> bool {
        self.model_type() == TypeId::of::<M>()
    }

    /// Borrows the typed proxy when the model is `M`.
    pub fn downcast_ref<M: Model>(&self) -> Option<&LazyObject<M>> {
        self.as_any().downcast_ref()
    }

    /// Identity used for object equality: model, lookup field and key.
    pub fn same_object(&self, other: &dyn AnyLazyObject) -> bool {
        self.model_type() == other.model_type()
            && self.model_meta().resolve_field(self.key_field()).ok().map(|f| f.name)
                == other.model_meta().resolve_field(other.key_field()).ok().map(|f| f.name)
            && self.key() == other.key()
    }
}

/// Recovers the typed proxy behind an [`ObjectRef`].
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use pathconv_db::{downcast, LazyObject, Model, ObjectRef, QuerySet};
/// # fn demo<M: Model>(qs: QuerySet<M>) {
/// let obj: ObjectRef = Arc::new(LazyObject::new(qs, "pk", 1_i64));
/// let typed: Arc<LazyObject<M>> = downcast(&obj).unwrap();
/// # let _ = typed;
/// # }
/// ```
pub fn downcast<M: Model>(obj: &ObjectRef) -> Option<Arc<LazyObject<M>>> {
    Arc::clone(obj).into_any_arc().downcast::<LazyObject<M>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldKind, Row};
    use crate::store::InMemoryStore;

    static USER: ModelMeta = ModelMeta {
        app_label: "auth",
        model_name: "user",
        pk_field: "id",
        fields: &[
            FieldDef::new("id", FieldKind::Int),
            FieldDef::new("username", FieldKind::Str),
        ],
    };

    static GROUP: ModelMeta = ModelMeta {
        app_label: "auth",
        model_name: "group",
        pk_field: "id",
        fields: &[FieldDef::new("id", FieldKind::Int)],
    };

    #[derive(Debug)]
    struct User {
        id: i64,
        username: String,
    }

    impl Model for User {
        fn meta() -> &'static ModelMeta {
            &USER
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::Int(self.id)),
                ("username", Value::String(self.username.clone())),
            ]
        }

        fn from_row(row: &Row) -> PathconvResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                username: row.get("username")?,
            })
        }
    }

    #[derive(Debug)]
    struct Group;

    impl Model for Group {
        fn meta() -> &'static ModelMeta {
            &GROUP
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![("id", Value::Int(1))]
        }

        fn from_row(_row: &Row) -> PathconvResult<Self> {
            Ok(Self)
        }
    }

    fn setup() -> (Arc<InMemoryStore>, QuerySet<User>) {
        let store = Arc::new(InMemoryStore::new("default"));
        store.insert(&User {
            id: 12,
            username: "bob".into(),
        });
        let qs = QuerySet::new(store.clone());
        (store, qs)
    }

    #[tokio::test]
    async fn test_resolves_once() {
        let (store, qs) = setup();
        let user = LazyObject::new(qs, "pk", 12_i64);
        assert_eq!(store.query_count(), 0);
        assert!(!user.is_resolved());

        assert_eq!(user.get().await.unwrap().username, "bob");
        assert_eq!(store.query_count(), 1);
        assert!(user.is_resolved());

        assert_eq!(user.get().await.unwrap().id, 12);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let (_store, qs) = setup();
        let user = LazyObject::new(qs, "pk", 404_i64);
        assert!(matches!(user.get().await, Err(PathconvError::NotFound(_))));
        assert!(!user.is_resolved());
    }

    #[test]
    fn test_identity_without_query() {
        let (store, qs) = setup();
        let user = LazyObject::new(qs, "pk", 12_i64);
        assert_eq!(user.model_meta().label(), "auth.user");
        assert_eq!(user.db(), "default");
        assert_eq!(user.pk(), Some(&Value::Int(12)));
        assert!(user.is_instance_of::<User>());
        assert!(!user.is_instance_of::<Group>());
        assert!(user.check_field().is_ok());
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_pk_unknown_for_field_lookup_until_resolved() {
        let (_store, qs) = setup();
        let user: ObjectRef = Arc::new(LazyObject::new(qs, "username", "bob"));
        assert_eq!(user.downcast_ref::<User>().unwrap().pk(), None);
        assert_eq!(user.pk_value(), None);
        assert_eq!(
            user.known_field_value("username"),
            Some(Value::from("bob"))
        );

        user.resolve().await.unwrap();
        assert_eq!(user.pk_value(), Some(Value::Int(12)));
    }

    #[test]
    fn test_check_field_rejects_unknown_field() {
        let (store, qs) = setup();
        let user = LazyObject::new(qs, "email", "bob@example.com");
        assert!(matches!(
            user.check_field(),
            Err(PathconvError::FieldError(_))
        ));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_from_instance_is_resolved() {
        let (store, qs) = setup();
        let user = LazyObject::from_instance(
            qs,
            "pk",
            User {
                id: 7,
                username: "eve".into(),
            },
        );
        assert!(user.is_resolved());
        assert_eq!(user.key(), &Value::Int(7));
        assert_eq!(user.get().await.unwrap().username, "eve");
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_with_queryset_forks() {
        let (store, qs) = setup();
        let replica = Arc::new(InMemoryStore::new("replica"));
        let user = LazyObject::new(qs, "pk", 12_i64);

        let forked = user.with_queryset(Some(QuerySet::new(replica.clone())));
        assert!(user.is_forked());
        assert!(!forked.is_forked());
        assert_eq!(forked.db(), "replica");
        assert_eq!(forked.key(), user.key());
        assert_eq!(user.db(), "default");
        assert_eq!(store.query_count() + replica.query_count(), 0);

        assert!(forked.get().await.is_err());
        assert_eq!(replica.query_count(), 1);
        assert!(!user.is_resolved());
    }

    #[test]
    fn test_downcast() {
        let (_store, qs) = setup();
        let obj: ObjectRef = Arc::new(LazyObject::new(qs, "pk", 12_i64));
        assert!(obj.is_instance::<User>());
        assert!(!obj.is_instance::<Group>());
        assert!(obj.downcast_ref::<User>().is_some());
        assert!(downcast::<Group>(&obj).is_none());
        let typed = downcast::<User>(&obj).unwrap();
        assert_eq!(typed.key(), &Value::Int(12));
    }

    #[test]
    fn test_same_object_normalizes_pk_alias() {
        let (_store, qs) = setup();
        let a: ObjectRef = Arc::new(LazyObject::new(qs.clone(), "pk", 12_i64));
        let b: ObjectRef = Arc::new(LazyObject::new(qs.clone(), "id", 12_i64));
        let c: ObjectRef = Arc::new(LazyObject::new(qs, "pk", 13_i64));
        assert!(a.same_object(b.as_ref()));
        assert!(!a.same_object(c.as_ref()));
    }
}
