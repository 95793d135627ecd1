//! Model trait and metadata.
//!
//! [`ModelMeta`] describes a model well enough to validate lookups and to
//! coerce URL fragments into key values without touching a store. The
//! [`Model`] trait ties a Rust type to its metadata and to [`Row`]s.

use std::fmt;

use pathconv_core::{PathconvError, PathconvResult};

use crate::value::{FromValue, Value};

/// The storage kind of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A 64-bit integer (`AutoField`, `IntegerField`).
    Int,
    /// A boolean.
    Bool,
    /// A float.
    Float,
    /// Text (`CharField`, `SlugField`).
    Str,
    /// A date.
    Date,
    /// A UUID.
    Uuid,
    /// Arbitrary JSON.
    Json,
}

impl FieldKind {
    /// Coerces a raw path fragment into a value of this kind.
    ///
    /// A fragment that does not parse is a [`PathconvError::BadRequest`], so
    /// the resolver can move on to the next pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathconv_db::model::FieldKind;
    /// use pathconv_db::value::Value;
    ///
    /// assert_eq!(FieldKind::Int.parse("12").unwrap(), Value::Int(12));
    /// assert!(FieldKind::Int.parse("twelve").is_err());
    /// ```
    pub fn parse(self, raw: &str) -> PathconvResult<Value> {
        let invalid = || PathconvError::BadRequest(format!("'{raw}' is not a valid {self}"));
        match self {
            Self::Int => raw.parse::<i64>().map(Value::Int).map_err(|_| invalid()),
            Self::Float => raw.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
            Self::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Self::Str => Ok(Value::String(raw.to_string())),
            Self::Date => chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| invalid()),
            Self::Uuid => uuid::Uuid::parse_str(raw)
                .map(Value::Uuid)
                .map_err(|_| invalid()),
            Self::Json => serde_json::from_str(raw)
                .map(Value::Json)
                .map_err(|_| invalid()),
        }
    }

    /// Returns `true` if `value` has this kind.
    pub const fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Int, Value::Int(_))
                | (Self::Bool, Value::Bool(_))
                | (Self::Float, Value::Float(_))
                | (Self::Str, Value::String(_))
                | (Self::Date, Value::Date(_))
                | (Self::Uuid, Value::Uuid(_))
                | (Self::Json, Value::Json(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Str => "str",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// A named, typed model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// The field name.
    pub name: &'static str,
    /// The storage kind.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a field definition.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Static metadata about a model.
///
/// Lives in a `static` so converters can hand out `&'static` references.
///
/// # Examples
///
/// ```
/// use pathconv_db::model::{FieldDef, FieldKind, ModelMeta};
///
/// static META: ModelMeta = ModelMeta {
///     app_label: "auth",
///     model_name: "user",
///     pk_field: "id",
///     fields: &[
///         FieldDef::new("id", FieldKind::Int),
///         FieldDef::new("username", FieldKind::Str),
///     ],
/// };
///
/// assert_eq!(META.label(), "auth.user");
/// assert_eq!(META.field("pk").unwrap().name, "id");
/// ```
#[derive(Debug)]
pub struct ModelMeta {
    /// The application label (e.g. "auth").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g. "user").
    pub model_name: &'static str,
    /// The name of the primary key field.
    pub pk_field: &'static str,
    /// Field definitions, primary key included.
    pub fields: &'static [FieldDef],
}

impl ModelMeta {
    /// Returns `"app_label.model_name"`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Looks a field up by name. `"pk"` aliases the primary key.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let name = if name == "pk" { self.pk_field } else { name };
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`field`](Self::field), but an unknown name is a
    /// [`PathconvError::FieldError`] listing the valid choices.
    pub fn resolve_field(&self, name: &str) -> PathconvResult<&'static FieldDef> {
        self.field(name).ok_or_else(|| {
            let choices: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
            PathconvError::FieldError(format!(
                "Cannot resolve keyword '{name}' into field of {}. Choices are: {}",
                self.label(),
                choices.join(", ")
            ))
        })
    }

    /// Returns the primary key field definition.
    pub fn pk(&self) -> PathconvResult<&'static FieldDef> {
        self.resolve_field(self.pk_field)
    }

    /// Returns `true` if `name` refers to the primary key.
    pub fn is_pk(&self, name: &str) -> bool {
        name == "pk" || name == self.pk_field
    }
}

impl PartialEq for ModelMeta {
    fn eq(&self, other: &Self) -> bool {
        self.app_label == other.app_label && self.model_name == other.model_name
    }
}

impl Eq for ModelMeta {}

/// The core trait for models that URL fragments can resolve to.
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns all field name-value pairs for this instance.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Constructs an instance from a stored row.
    fn from_row(row: &Row) -> PathconvResult<Self>
    where
        Self: Sized;

    /// Returns the value of one field. `"pk"` aliases the primary key.
    fn field_value(&self, name: &str) -> Option<Value> {
        let field = Self::meta().field(name)?;
        self.field_values()
            .into_iter()
            .find(|(n, _)| *n == field.name)
            .map(|(_, v)| v)
    }

    /// Returns the primary key value.
    fn pk(&self) -> Value {
        self.field_value("pk").unwrap_or(Value::Null)
    }

    /// Converts this instance into a row.
    fn to_row(&self) -> Row {
        let (columns, values) = self
            .field_values()
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .unzip();
        Row::new(columns, values)
    }
}

/// A stored record: column names paired with values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the raw value of a column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> PathconvResult<T> {
        let value = self.value(column).ok_or_else(|| {
            PathconvError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let (columns, values) = iter.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static META: ModelMeta = ModelMeta {
        app_label: "blog",
        model_name: "article",
        pk_field: "id",
        fields: &[
            FieldDef::new("id", FieldKind::Int),
            FieldDef::new("slug", FieldKind::Str),
        ],
    };

    struct Article {
        id: i64,
        slug: String,
    }

    impl Model for Article {
        fn meta() -> &'static ModelMeta {
            &META
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::Int(self.id)),
                ("slug", Value::String(self.slug.clone())),
            ]
        }

        fn from_row(row: &Row) -> PathconvResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                slug: row.get("slug")?,
            })
        }
    }

    #[test]
    fn test_label_and_pk_alias() {
        assert_eq!(META.label(), "blog.article");
        assert_eq!(META.field("pk").unwrap().name, "id");
        assert!(META.is_pk("pk"));
        assert!(META.is_pk("id"));
        assert!(!META.is_pk("slug"));
    }

    #[test]
    fn test_resolve_field_unknown() {
        let err = META.resolve_field("title").unwrap_err();
        assert!(matches!(err, PathconvError::FieldError(_)));
        assert!(err.to_string().contains("Choices are: id, slug"));
    }

    #[test]
    fn test_model_row_round_trip() {
        let a = Article {
            id: 3,
            slug: "hello".into(),
        };
        let row = a.to_row();
        let b = Article::from_row(&row).unwrap();
        assert_eq!(b.id, 3);
        assert_eq!(b.slug, "hello");
        assert_eq!(a.pk(), Value::Int(3));
        assert_eq!(a.field_value("slug"), Some(Value::from("hello")));
        assert_eq!(a.field_value("missing"), None);
    }

    #[test]
    fn test_row_get_missing_column() {
        let row: Row = [("id", Value::Int(1))].into_iter().collect();
        assert!(row.get::<i64>("nope").is_err());
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_field_kind_parse() {
        assert_eq!(FieldKind::Bool.parse("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(
            FieldKind::Date.parse("2023-01-21").unwrap(),
            Value::Date(chrono::NaiveDate::from_ymd_opt(2023, 1, 21).unwrap())
        );
        assert!(matches!(
            FieldKind::Uuid.parse("nope"),
            Err(PathconvError::BadRequest(_))
        ));
        assert_eq!(
            FieldKind::Json.parse("[1,2]").unwrap(),
            Value::Json(serde_json::json!([1, 2]))
        );
    }

    #[test]
    fn test_field_kind_accepts() {
        assert!(FieldKind::Int.accepts(&Value::Int(1)));
        assert!(!FieldKind::Int.accepts(&Value::from("1")));
    }
}
