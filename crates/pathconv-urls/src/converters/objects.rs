//! Converters that load model objects from path fragments.
//!
//! - [`ModelConverter`] (`model`) turns `app/model` into a model class.
//! - [`ObjectConverter`] (`object`) turns `app/model/pk` into an object of
//!   any registered model.
//! - [`ModelObjectConverter`] turns a key fragment into an object of one
//!   fixed model, looked up by primary key (`auth.user`) or by another field
//!   (`user.username`).
//!
//! Object converters either load the record while the URL is resolved
//! ([`Loading::Eager`]) or hand the view an unresolved
//! [`LazyObject`](pathconv_db::LazyObject) ([`Loading::Lazy`]). A missing
//! record found during resolution is a rejection, so routing moves on to the
//! next pattern.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::{ConverterSettings, LazyProbeMode, PathconvError, PathconvResult};
use pathconv_db::{
    Databases, FieldDef, FieldKind, LazyObject, Model, ModelHandle, ModelMeta, ModelRegistry,
    ObjectRef, ObjectStore, QuerySet, Value, DEFAULT_DB_ALIAS,
};

use super::builtin::UUID_REGEX;
use super::dates::DATE_REGEX;
use super::{unexpected, ConverterInfo, ConverterName, PathConverter, PathValue, ValueKind};

/// How much a lazy object converter checks before handing out the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyProbe {
    /// No checks.
    None,
    /// Validate the lookup field and key kind. Never queries.
    Field,
    /// Run an existence query and reject missing records.
    Exists,
}

impl From<LazyProbeMode> for LazyProbe {
    fn from(mode: LazyProbeMode) -> Self {
        match mode {
            LazyProbeMode::None => Self::None,
            LazyProbeMode::Field => Self::Field,
            LazyProbeMode::Exists => Self::Exists,
        }
    }
}

/// When an object converter loads its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loading {
    /// Query while resolving the URL.
    Eager,
    /// Hand out an unresolved proxy.
    Lazy(LazyProbe),
}

impl Loading {
    /// Lazy loading with the configured probe.
    pub fn from_settings(settings: &ConverterSettings) -> Self {
        Self::Lazy(settings.lazy_probe.into())
    }

    const fn queries_on_resolve(self) -> bool {
        matches!(self, Self::Eager | Self::Lazy(LazyProbe::Exists))
    }
}

impl Default for Loading {
    fn default() -> Self {
        Self::Lazy(LazyProbe::Field)
    }
}

fn missing(meta: &ModelMeta, field: &str, key: &Value) -> PathconvError {
    PathconvError::BadRequest(format!(
        "{} with {field} = {key} does not exist",
        meta.label()
    ))
}

fn check_key(meta: &ModelMeta, field: &str, key: &Value) -> PathconvResult<&'static FieldDef> {
    let def = meta.resolve_field(field)?;
    if !def.kind.accepts(key) {
        return Err(PathconvError::BadRequest(format!(
            "'{key}' is not a valid {} for {}.{}",
            def.kind,
            meta.label(),
            def.name
        )));
    }
    Ok(def)
}

/// Loads through a type-erased model handle.
async fn load_with_handle(
    handle: &dyn ModelHandle,
    store: Arc<dyn ObjectStore>,
    field: &str,
    key: Value,
    loading: Loading,
) -> PathconvResult<ObjectRef> {
    let meta = handle.meta();
    match loading {
        Loading::Eager => handle
            .eager(store, field, key.clone())
            .await
            .map_err(|e| match e {
                PathconvError::DoesNotExist(_) => missing(meta, field, &key),
                other => other,
            }),
        Loading::Lazy(LazyProbe::None) => Ok(handle.lazy(store, field, key)),
        Loading::Lazy(LazyProbe::Field) => {
            check_key(meta, field, &key)?;
            Ok(handle.lazy(store, field, key))
        }
        Loading::Lazy(LazyProbe::Exists) => {
            if !handle.exists(Arc::clone(&store), field, key.clone()).await? {
                return Err(missing(meta, field, &key));
            }
            Ok(handle.lazy(store, field, key))
        }
    }
}

/// Returns a regex for fragments of `kind`.
pub fn kind_regex(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Int => "-?[0-9]+",
        FieldKind::Bool => "(?i:true|false|1|0)",
        FieldKind::Float => "-?[0-9]+(?:\\.[0-9]+)?",
        FieldKind::Str | FieldKind::Json => "[^/]+",
        FieldKind::Date => DATE_REGEX,
        FieldKind::Uuid => UUID_REGEX,
    }
}

/// Converter for `app_label/model_name` fragments.
#[derive(Debug)]
pub struct ModelConverter {
    info: ConverterInfo,
    models: Arc<ModelRegistry>,
}

impl ModelConverter {
    /// Builds the converter over `models`. Examples name every registered
    /// model.
    pub fn new(models: Arc<ModelRegistry>) -> Self {
        let examples = models
            .models()
            .iter()
            .map(|m| format!("{}/{}", m.app_label, m.model_name))
            .collect();
        let info = ConverterInfo::new("model", "[^/]+/[^/]+")
            .owned_examples(examples)
            .accepts(ValueKind::Model);
        Self { info, models }
    }
}

#[async_trait]
impl PathConverter for ModelConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let (app, model) = fragment.split_once('/').ok_or_else(|| {
            PathconvError::BadRequest(format!("'{fragment}' is not of the form 'app/model'"))
        })?;
        Ok(PathValue::Model(self.models.get(app, model)?.meta()))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Model(meta) => Ok(format!(
                "{}/{}",
                meta.app_label,
                meta.model_name.to_lowercase()
            )),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for `app_label/model_name/pk` fragments, loading from the
/// default database.
#[derive(Debug)]
pub struct ObjectConverter {
    info: ConverterInfo,
    models: Arc<ModelRegistry>,
    databases: Arc<Databases>,
    loading: Loading,
}

impl ObjectConverter {
    /// Builds the converter. Without data to query, examples are only
    /// declared for lazy loading that never queries, one per model with an
    /// integer primary key.
    pub fn new(models: Arc<ModelRegistry>, databases: Arc<Databases>, loading: Loading) -> Self {
        let examples = if loading.queries_on_resolve() {
            Vec::new()
        } else {
            models
                .models()
                .iter()
                .filter(|m| m.pk().is_ok_and(|pk| pk.kind == FieldKind::Int))
                .map(|m| format!("{}/{}/1", m.app_label, m.model_name))
                .collect()
        };
        let info = ConverterInfo::new("object", "[^/]+/[^/]+/[^/]+")
            .owned_examples(examples)
            .accepts(ValueKind::Object(None));
        Self {
            info,
            models,
            databases,
            loading,
        }
    }

    /// Returns the loading mode.
    pub const fn loading(&self) -> Loading {
        self.loading
    }
}

#[async_trait]
impl PathConverter for ObjectConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let mut parts = fragment.splitn(3, '/');
        let (Some(app), Some(model), Some(raw_pk)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PathconvError::BadRequest(format!(
                "'{fragment}' is not of the form 'app/model/pk'"
            )));
        };

        let handle = self.models.get(app, model)?;
        let pk = handle.meta().pk()?;
        let key = pk.kind.parse(raw_pk)?;
        let store = self.databases.default_store()?;

        let obj = load_with_handle(handle.as_ref(), store, pk.name, key, self.loading).await?;
        Ok(PathValue::Object(obj))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        let PathValue::Object(obj) = value else {
            return Err(unexpected(self, value));
        };
        let meta = obj.model_meta();
        let pk = obj.pk_value().ok_or_else(|| {
            PathconvError::BadRequest(format!(
                "Cannot render {} looked up by '{}' before it is loaded",
                meta.label(),
                obj.key_field()
            ))
        })?;
        Ok(format!("{}/{}/{pk}", meta.app_label, meta.model_name))
    }
}

/// Converter for objects of one model, looked up by a single field.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use pathconv_db::{Databases, Model};
/// # use pathconv_urls::converters::objects::{Loading, ModelObjectConverter};
/// # use pathconv_urls::converters::PathConverter;
/// # fn demo<M: Model>(dbs: Arc<Databases>) -> pathconv_core::PathconvResult<()> {
/// let by_pk = ModelObjectConverter::<M>::new(Arc::clone(&dbs), None, Loading::Eager)?;
/// let by_name = ModelObjectConverter::<M>::new(dbs, Some("username"), Loading::default())?;
/// println!("{} {}", by_pk.name(), by_name.name()); // "auth.user user.username"
/// # Ok(())
/// # }
/// ```
pub struct ModelObjectConverter<M: Model> {
    info: ConverterInfo,
    databases: Arc<Databases>,
    db: String,
    field: &'static FieldDef,
    key_converter: Option<Arc<dyn PathConverter>>,
    loading: Loading,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelObjectConverter<M> {
    /// Builds the converter for lookups by `field`, or by primary key when
    /// `field` is `None`.
    ///
    /// # Errors
    ///
    /// [`PathconvError::FieldError`] when the model has no such field.
    pub fn new(
        databases: Arc<Databases>,
        field: Option<&str>,
        loading: Loading,
    ) -> PathconvResult<Self> {
        let meta = M::meta();
        let (def, name) = match field {
            Some(f) if !meta.is_pk(f) => {
                let def = meta.resolve_field(f)?;
                (def, format!("{}.{}", meta.model_name, def.name))
            }
            _ => (meta.pk()?, meta.label()),
        };

        let info = ConverterInfo::new(String::new(), kind_regex(def.kind))
            .named(ConverterName::new(name))
            .accepts(ValueKind::Object(Some(meta)));

        Ok(Self {
            info,
            databases,
            db: DEFAULT_DB_ALIAS.to_string(),
            field: def,
            key_converter: None,
            loading,
            _model: PhantomData,
        })
    }

    /// Parses and renders keys with `converter`, adopting its regex.
    #[must_use]
    pub fn with_key_converter(mut self, converter: Arc<dyn PathConverter>) -> Self {
        self.info.regex = converter.regex().to_string();
        self.key_converter = Some(converter);
        self
    }

    /// Loads from the database `alias` instead of the default one.
    #[must_use]
    pub fn using(mut self, alias: &str) -> Self {
        self.db = alias.to_string();
        self
    }

    /// Sets the declared examples.
    #[must_use]
    pub fn with_examples<'a>(
        mut self,
        examples: impl Into<pathconv_core::utils::OneOrMany<&'a str>>,
    ) -> Self {
        self.info = self.info.examples(examples);
        self
    }

    /// Replaces the registration name.
    #[must_use]
    pub fn named(mut self, name: ConverterName) -> Self {
        self.info = self.info.named(name);
        self
    }

    /// Returns the lookup field.
    pub const fn field(&self) -> &'static FieldDef {
        self.field
    }

    /// Returns the loading mode.
    pub const fn loading(&self) -> Loading {
        self.loading
    }

    async fn key(&self, fragment: &str) -> PathconvResult<Value> {
        match &self.key_converter {
            Some(conv) => conv.to_value(fragment).await?.to_db_value(),
            None => self.field.kind.parse(fragment),
        }
    }

    async fn load(&self, key: Value) -> PathconvResult<LazyObject<M>> {
        let meta = M::meta();
        let field = self.field.name;
        let queryset = QuerySet::<M>::new(self.databases.get(&self.db)?);

        match self.loading {
            Loading::Eager => {
                let instance = queryset
                    .clone()
                    .filter(field, key.clone())?
                    .get()
                    .await
                    .map_err(|e| match e {
                        PathconvError::DoesNotExist(_) => missing(meta, field, &key),
                        other => other,
                    })?;
                Ok(LazyObject::from_instance(queryset, field, instance))
            }
            Loading::Lazy(probe) => {
                match probe {
                    LazyProbe::None => {}
                    LazyProbe::Field => {
                        check_key(meta, field, &key)?;
                    }
                    LazyProbe::Exists => {
                        if !queryset.clone().filter(field, key.clone())?.exists().await? {
                            return Err(missing(meta, field, &key));
                        }
                    }
                }
                Ok(LazyObject::new(queryset, field, key))
            }
        }
    }
}

impl<M: Model> std::fmt::Debug for ModelObjectConverter<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelObjectConverter")
            .field("name", &self.info.name.to_string())
            .field("db", &self.db)
            .field("field", &self.field.name)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<M: Model> PathConverter for ModelObjectConverter<M> {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let key = self.key(fragment).await?;
        let obj: ObjectRef = Arc::new(self.load(key).await?);
        Ok(PathValue::Object(obj))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        let PathValue::Object(obj) = value else {
            return Err(unexpected(self, value));
        };
        if !obj.is_instance::<M>() {
            return Err(unexpected(self, value));
        }
        let key = obj.known_field_value(self.field.name).ok_or_else(|| {
            PathconvError::BadRequest(format!(
                "Cannot render {}.{} of an object looked up by '{}' before it is loaded",
                M::meta().label(),
                self.field.name,
                obj.key_field()
            ))
        })?;
        match &self.key_converter {
            Some(conv) => conv.to_url(&PathValue::from_db_value(key)),
            None => Ok(key.to_string()),
        }
    }
}
