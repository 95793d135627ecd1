//! Path converters.
//!
//! This module provides the [`PathConverter`] trait and the value types it
//! produces. Submodules hold the concrete converters and the mixins they are
//! composed from.
//!
//! # Built-in converters
//!
//! | Name        | Regex                                   | Value                 |
//! |-------------|-----------------------------------------|-----------------------|
//! | `int`       | `[0-9]+`                                | `Int`                 |
//! | `str`       | `[^/]+`                                 | `Str`                 |
//! | `slug`      | `[-a-zA-Z0-9_]+`                        | `Str`                 |
//! | `uuid`      | `[0-9a-f]{8}-...-[0-9a-f]{12}`          | `Uuid`                |
//! | `path`      | `.+`                                    | `Str`                 |
//! | `bool`      | `true`, `no`, `1`, ... (any case)       | `Bool`                |
//! | `json`      | `[^/]+`                                 | `Json`                |
//! | `date`      | `YYYY-M-D`                              | `Date`                |
//! | `month`     | `YYYY-M`                                | `Date` (first day)    |
//! | `week`      | `YYYY-Www`                              | `Date` (ISO Monday)   |
//! | `daterange` | `date/date`                             | `Tuple(start, end)`   |
//! | `null*`     | inner or `null`/`none`/empty            | inner or `Null`       |
//! | `model`     | `app/model`                             | `Model`               |
//! | `object`    | `app/model/pk`                          | `Object`              |

pub mod builtin;
pub mod combined;
pub mod dates;
pub mod nullable;
pub mod objects;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::utils::OneOrMany;
use pathconv_core::{PathconvError, PathconvResult};
use pathconv_db::{downcast, LazyObject, Model, ModelMeta, ObjectRef, Value};
use serde::Serialize;

/// A typed value produced from (or rendered into) a URL path fragment.
#[derive(Debug, Clone)]
pub enum PathValue {
    /// The absent value produced by nullable converters.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A UUID.
    Uuid(uuid::Uuid),
    /// A date.
    Date(chrono::NaiveDate),
    /// A JSON document.
    Json(serde_json::Value),
    /// Named fields of a combined converter, in declaration order.
    Tuple(Vec<(String, PathValue)>),
    /// A model class.
    Model(&'static ModelMeta),
    /// A (possibly unresolved) model instance.
    Object(ObjectRef),
}

impl PathValue {
    /// Returns the string payload of a [`PathValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the payload of a [`PathValue::Int`].
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the payload of a [`PathValue::Date`].
    pub const fn as_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the object of a [`PathValue::Object`].
    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the typed lazy object when this is an object of model `M`.
    pub fn object<M: Model>(&self) -> Option<Arc<LazyObject<M>>> {
        self.as_object().and_then(downcast::<M>)
    }

    /// Returns a field of a [`PathValue::Tuple`] by name.
    pub fn field(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Tuple(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns `true` for [`PathValue::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts a scalar into a stored value for lookups.
    ///
    /// # Errors
    ///
    /// [`PathconvError::BadRequest`] for tuples, models and objects.
    pub fn to_db_value(&self) -> PathconvResult<Value> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool(b) => Ok(Value::Bool(*b)),
            Self::Int(i) => Ok(Value::Int(*i)),
            Self::Str(s) => Ok(Value::String(s.clone())),
            Self::Uuid(u) => Ok(Value::Uuid(*u)),
            Self::Date(d) => Ok(Value::Date(*d)),
            Self::Json(j) => Ok(Value::Json(j.clone())),
            other => Err(PathconvError::BadRequest(format!(
                "{} cannot be used as a lookup value",
                ValueKind::of(other)
            ))),
        }
    }

    /// Converts a stored value into a path value. Floats become strings.
    pub fn from_db_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::Int(i),
            Value::Float(f) => Self::Str(f.to_string()),
            Value::String(s) => Self::Str(s),
            Value::Date(d) => Self::Date(d),
            Value::Uuid(u) => Self::Uuid(u),
            Value::Json(j) => Self::Json(j),
        }
    }
}

impl PartialEq for PathValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Model(a), Self::Model(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.same_object(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Json(j) => write!(f, "{j}"),
            Self::Tuple(fields) => {
                write!(f, "(")?;
                for (i, (_, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            Self::Model(meta) => write!(f, "{}", meta.label()),
            Self::Object(obj) => write!(f, "{}({})", obj.model_meta().label(), obj.key()),
        }
    }
}

impl From<bool> for PathValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PathValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for PathValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PathValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<chrono::NaiveDate> for PathValue {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<uuid::Uuid> for PathValue {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<ObjectRef> for PathValue {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

/// The kind of a [`PathValue`], used to declare what a converter produces and
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`PathValue::Null`].
    Null,
    /// [`PathValue::Bool`].
    Bool,
    /// [`PathValue::Int`].
    Int,
    /// [`PathValue::Str`].
    Str,
    /// [`PathValue::Uuid`].
    Uuid,
    /// [`PathValue::Date`].
    Date,
    /// [`PathValue::Json`].
    Json,
    /// [`PathValue::Tuple`].
    Tuple,
    /// [`PathValue::Model`].
    Model,
    /// [`PathValue::Object`], optionally of one model only.
    Object(Option<&'static ModelMeta>),
}

impl ValueKind {
    /// Returns the kind of `value`, with the object's model when it has one.
    pub fn of(value: &PathValue) -> Self {
        match value {
            PathValue::Null => Self::Null,
            PathValue::Bool(_) => Self::Bool,
            PathValue::Int(_) => Self::Int,
            PathValue::Str(_) => Self::Str,
            PathValue::Uuid(_) => Self::Uuid,
            PathValue::Date(_) => Self::Date,
            PathValue::Json(_) => Self::Json,
            PathValue::Tuple(_) => Self::Tuple,
            PathValue::Model(_) => Self::Model,
            PathValue::Object(obj) => Self::Object(Some(obj.model_meta())),
        }
    }

    /// Returns `true` if `value` is of this kind. `Object(None)` accepts any
    /// object; `Object(Some(meta))` only objects of that model.
    pub fn matches(&self, value: &PathValue) -> bool {
        match (self, value) {
            (Self::Object(None), PathValue::Object(_)) => true,
            (Self::Object(Some(meta)), PathValue::Object(obj)) => *meta == obj.model_meta(),
            (kind, value) => *kind == Self::of(value),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Str => f.write_str("str"),
            Self::Uuid => f.write_str("uuid"),
            Self::Date => f.write_str("date"),
            Self::Json => f.write_str("json"),
            Self::Tuple => f.write_str("tuple"),
            Self::Model => f.write_str("model"),
            Self::Object(None) => f.write_str("object"),
            Self::Object(Some(meta)) => write!(f, "{}", meta.label()),
        }
    }
}

/// A converter name built from a prefix, a base and a suffix.
///
/// Mixins extend names instead of replacing them: the nullable mixin adds the
/// `null` prefix, so `bool` becomes `nullbool`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterName {
    /// Prepended to the base.
    pub prefix: String,
    /// The base name.
    pub base: String,
    /// Appended to the base.
    pub suffix: String,
}

impl ConverterName {
    /// Creates a name with no prefix or suffix.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Returns the name with `prefix` prepended to the existing prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix.insert_str(0, prefix);
        self
    }

    /// Returns the name with `suffix` appended to the existing suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix.push_str(suffix);
        self
    }
}

impl fmt::Display for ConverterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.base, self.suffix)
    }
}

/// Declarative description of a converter.
///
/// # Examples
///
/// ```
/// use pathconv_urls::converters::{ConverterInfo, ValueKind};
///
/// let info = ConverterInfo::new("date", "[0-9]{4}-[0-9]{2}-[0-9]{2}")
///     .examples("2023-01-21")
///     .accepts(ValueKind::Date);
/// assert_eq!(info.examples, vec!["2023-01-21"]);
/// assert_eq!(info.accepts, vec![ValueKind::Date]);
/// ```
#[derive(Debug, Clone)]
pub struct ConverterInfo {
    /// The registration name.
    pub name: ConverterName,
    /// The regex a fragment must match. Must not be anchored.
    pub regex: String,
    /// Fragments the converter must round-trip.
    pub examples: Vec<String>,
    /// Kinds `to_value` produces and `to_url` accepts, the primary kind first.
    pub accepts: Vec<ValueKind>,
    /// Whether `to_url` passes strings through unchanged.
    pub pass_str: bool,
}

impl ConverterInfo {
    /// Creates a description with no examples that accepts strings.
    pub fn new(name: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            name: ConverterName::new(name),
            regex: regex.into(),
            examples: Vec::new(),
            accepts: vec![ValueKind::Str],
            pass_str: true,
        }
    }

    /// Sets the examples from one fragment or a list.
    #[must_use]
    pub fn examples<'a>(mut self, examples: impl Into<OneOrMany<&'a str>>) -> Self {
        self.examples = examples
            .into()
            .into_iter()
            .map(str::to_string)
            .collect();
        self
    }

    /// Sets the examples from owned strings.
    #[must_use]
    pub fn owned_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    /// Sets the accepted kinds from one kind or a list.
    #[must_use]
    pub fn accepts(mut self, kinds: impl Into<OneOrMany<ValueKind>>) -> Self {
        self.accepts = kinds.into().into_vec();
        self
    }

    /// Sets whether `to_url` passes strings through.
    #[must_use]
    pub fn pass_str(mut self, pass_str: bool) -> Self {
        self.pass_str = pass_str;
        self
    }

    /// Replaces the name.
    #[must_use]
    pub fn named(mut self, name: ConverterName) -> Self {
        self.name = name;
        self
    }
}

/// Serializable summary of a converter, as listed by the introspection
/// commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterSummary {
    /// The registration name.
    pub name: String,
    /// The converter regex.
    pub regex: String,
    /// Kinds produced by `to_value`.
    pub to_types: Vec<String>,
    /// Kinds accepted by `to_url`.
    pub from_types: Vec<String>,
    /// Declared examples.
    pub examples: Vec<String>,
}

/// Converts URL path fragments to typed values and back.
///
/// Implementors provide [`info`](Self::info), [`to_value`](Self::to_value)
/// and [`render`](Self::render); everything else derives from those.
///
/// A converter satisfies the round-trip law for each example `e`:
/// `to_value(to_url(to_value(e)))` equals `to_value(e)` and rendering is
/// stable after the first pass.
#[async_trait]
pub trait PathConverter: Send + Sync + fmt::Debug {
    /// Returns the declarative description.
    fn info(&self) -> &ConverterInfo;

    /// Converts a matched fragment into a value.
    ///
    /// # Errors
    ///
    /// [`PathconvError::BadRequest`] when the fragment is rejected; the
    /// resolver then tries the next pattern.
    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue>;

    /// Renders a value into a fragment, ignoring `pass_str`.
    fn render(&self, value: &PathValue) -> PathconvResult<String>;

    /// Returns the registration name.
    fn name(&self) -> String {
        self.info().name.to_string()
    }

    /// Returns the converter regex.
    fn regex(&self) -> &str {
        &self.info().regex
    }

    /// Returns the declared examples.
    fn examples(&self) -> &[String] {
        &self.info().examples
    }

    /// Returns the kinds `to_value` produces.
    fn accepts(&self) -> &[ValueKind] {
        &self.info().accepts
    }

    /// Returns the kinds `to_url` takes: the accepted kinds plus `str` when
    /// strings pass through.
    fn from_types(&self) -> Vec<ValueKind> {
        let mut kinds = self.accepts().to_vec();
        if self.info().pass_str && !kinds.contains(&ValueKind::Str) {
            kinds.push(ValueKind::Str);
        }
        kinds
    }

    /// Renders a value into a fragment. Strings pass through unchanged when
    /// `pass_str` is set.
    fn to_url(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Str(s) if self.info().pass_str => Ok(s.clone()),
            other => self.render(other),
        }
    }

    /// Returns the serializable summary.
    fn summary(&self) -> ConverterSummary {
        let kinds = |ks: &[ValueKind]| ks.iter().map(ToString::to_string).collect();
        ConverterSummary {
            name: self.name(),
            regex: self.regex().to_string(),
            to_types: kinds(self.accepts()),
            from_types: kinds(&self.from_types()),
            examples: self.examples().to_vec(),
        }
    }
}

/// Builds the error for a value of the wrong kind.
pub(crate) fn unexpected(converter: &dyn PathConverter, value: &PathValue) -> PathconvError {
    PathconvError::BadRequest(format!(
        "Converter '{}' cannot render a {} value",
        converter.name(),
        ValueKind::of(value)
    ))
}
