//! Model registry.
//!
//! Converters such as `model` and `object` name a model in the URL itself
//! (`auth/user`). [`ModelRegistry`] resolves those names to type-erased
//! [`ModelHandle`]s that can build lazy or eagerly loaded objects without the
//! caller knowing the concrete model type.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult};

use crate::lazy::{LazyObject, ObjectRef};
use crate::model::{Model, ModelMeta};
use crate::queryset::QuerySet;
use crate::store::ObjectStore;
use crate::value::Value;

/// Type-erased access to one registered model.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Returns the model metadata.
    fn meta(&self) -> &'static ModelMeta;

    /// Builds an unresolved proxy. Never queries.
    fn lazy(&self, store: Arc<dyn ObjectStore>, key_field: &str, key: Value) -> ObjectRef;

    /// Loads the record now and wraps it in a resolved proxy.
    ///
    /// Returns [`PathconvError::DoesNotExist`] when nothing matches.
    async fn eager(
        &self,
        store: Arc<dyn ObjectStore>,
        key_field: &str,
        key: Value,
    ) -> PathconvResult<ObjectRef>;

    /// Runs an existence query for the key.
    async fn exists(
        &self,
        store: Arc<dyn ObjectStore>,
        key_field: &str,
        key: Value,
    ) -> PathconvResult<bool>;
}

struct TypedHandle<M>(PhantomData<fn() -> M>);

#[async_trait]
impl<M: Model> ModelHandle for TypedHandle<M> {
    fn meta(&self) -> &'static ModelMeta {
        M::meta()
    }

    fn lazy(&self, store: Arc<dyn ObjectStore>, key_field: &str, key: Value) -> ObjectRef {
        Arc::new(LazyObject::new(QuerySet::<M>::new(store), key_field, key))
    }

    async fn eager(
        &self,
        store: Arc<dyn ObjectStore>,
        key_field: &str,
        key: Value,
    ) -> PathconvResult<ObjectRef> {
        let qs = QuerySet::<M>::new(store);
        let instance = qs.clone().filter(key_field, key)?.get().await?;
        Ok(Arc::new(LazyObject::from_instance(qs, key_field, instance)))
    }

    async fn exists(
        &self,
        store: Arc<dyn ObjectStore>,
        key_field: &str,
        key: Value,
    ) -> PathconvResult<bool> {
        QuerySet::<M>::new(store).filter(key_field, key)?.exists().await
    }
}

/// Registered models keyed by `(app_label, model_name)`.
///
/// # Examples
///
/// ```no_run
/// # use pathconv_db::{Model, ModelRegistry};
/// # fn demo<User: Model>() {
/// let mut models = ModelRegistry::new();
/// models.register::<User>();
/// assert!(models.get("auth", "User").is_ok());
/// # }
/// ```
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<(String, String), Arc<dyn ModelHandle>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers model `M`, replacing an earlier model with the same label.
    pub fn register<M: Model>(&mut self) -> &mut Self {
        let meta = M::meta();
        tracing::debug!(model = %meta.label(), "registered model");
        self.models.insert(
            (meta.app_label.to_string(), meta.model_name.to_lowercase()),
            Arc::new(TypedHandle::<M>(PhantomData)),
        );
        self
    }

    /// Looks a model up. The model name is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// [`PathconvError::BadRequest`] for unknown apps or models, so a URL
    /// naming one is simply not matched.
    pub fn get(&self, app_label: &str, model_name: &str) -> PathconvResult<Arc<dyn ModelHandle>> {
        if !self.models.keys().any(|(app, _)| app == app_label) {
            return Err(PathconvError::BadRequest(format!(
                "No installed app with label '{app_label}'."
            )));
        }
        self.models
            .get(&(app_label.to_string(), model_name.to_lowercase()))
            .cloned()
            .ok_or_else(|| {
                PathconvError::BadRequest(format!(
                    "App '{app_label}' doesn't have a '{model_name}' model."
                ))
            })
    }

    /// Looks a model up by its `"app_label.model_name"` label.
    pub fn get_by_label(&self, label: &str) -> PathconvResult<Arc<dyn ModelHandle>> {
        let (app, model) = label.split_once('.').ok_or_else(|| {
            PathconvError::BadRequest(format!(
                "'{label}' is not of the form 'app_label.model_name'."
            ))
        })?;
        self.get(app, model)
    }

    /// Returns the metadata of every registered model, sorted by label.
    pub fn models(&self) -> Vec<&'static ModelMeta> {
        self.models.values().map(|h| h.meta()).collect()
    }

    /// Returns the number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<String> = self.models().iter().map(|m| m.label()).collect();
        f.debug_struct("ModelRegistry")
            .field("models", &labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldKind, Row};
    use crate::store::InMemoryStore;

    static NOTE: ModelMeta = ModelMeta {
        app_label: "notes",
        model_name: "note",
        pk_field: "id",
        fields: &[
            FieldDef::new("id", FieldKind::Int),
            FieldDef::new("title", FieldKind::Str),
        ],
    };

    #[derive(Debug)]
    struct Note {
        id: i64,
        title: String,
    }

    impl Model for Note {
        fn meta() -> &'static ModelMeta {
            &NOTE
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::Int(self.id)),
                ("title", Value::String(self.title.clone())),
            ]
        }

        fn from_row(row: &Row) -> PathconvResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                title: row.get("title")?,
            })
        }
    }

    fn registry() -> ModelRegistry {
        let mut models = ModelRegistry::new();
        models.register::<Note>();
        models
    }

    #[test]
    fn test_lookup() {
        let models = registry();
        assert_eq!(models.get("notes", "Note").unwrap().meta().label(), "notes.note");
        assert!(models.get_by_label("notes.note").is_ok());
        assert!(matches!(
            models.get("blog", "note"),
            Err(PathconvError::BadRequest(msg)) if msg.contains("No installed app")
        ));
        assert!(matches!(
            models.get("notes", "page"),
            Err(PathconvError::BadRequest(msg)) if msg.contains("doesn't have")
        ));
        assert!(models.get_by_label("notes").is_err());
    }

    #[tokio::test]
    async fn test_lazy_and_eager_handles() {
        let store = Arc::new(InMemoryStore::new("default"));
        store.insert(&Note {
            id: 1,
            title: "hi".into(),
        });
        let handle = registry().get("notes", "note").unwrap();

        let lazy = handle.lazy(store.clone(), "pk", Value::Int(1));
        assert!(!lazy.is_resolved());
        assert_eq!(store.query_count(), 0);

        let eager = handle.eager(store.clone(), "pk", Value::Int(1)).await.unwrap();
        assert!(eager.is_resolved());
        assert_eq!(store.query_count(), 1);
        assert!(eager.is_instance::<Note>());
        assert!(eager.same_object(lazy.as_ref()));

        assert!(!handle.exists(store.clone(), "pk", Value::Int(2)).await.unwrap());
        assert!(matches!(
            handle.eager(store.clone(), "pk", Value::Int(2)).await,
            Err(PathconvError::DoesNotExist(_))
        ));
    }
}
