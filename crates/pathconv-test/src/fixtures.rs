//! Fixture models and seeded stores.
//!
//! `auth.User` and `auth.Group` stand in for the usual auth models. Every
//! seeded store holds the same records:
//!
//! | model | pk | name |
//! |---|---|---|
//! | `auth.user` | 12 | `Foo` |
//! | `auth.user` | 13 | `Bar` |
//! | `auth.group` | 123 | `Foo` |

use std::sync::Arc;

use pathconv_core::{ConverterSettings, PathconvResult};
use pathconv_db::{Databases, FieldDef, FieldKind, InMemoryStore, Model, ModelMeta, ModelRegistry, Row, Value};
use pathconv_urls::ConverterRegistry;

static USER_META: ModelMeta = ModelMeta {
    app_label: "auth",
    model_name: "user",
    pk_field: "id",
    fields: &[
        FieldDef::new("id", FieldKind::Int),
        FieldDef::new("username", FieldKind::Str),
    ],
};

static GROUP_META: ModelMeta = ModelMeta {
    app_label: "auth",
    model_name: "group",
    pk_field: "id",
    fields: &[
        FieldDef::new("id", FieldKind::Int),
        FieldDef::new("name", FieldKind::Str),
    ],
};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Unique login name.
    pub username: String,
}

impl Model for User {
    fn meta() -> &'static ModelMeta {
        &USER_META
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

/// A group of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Primary key.
    pub id: i64,
    /// Group name.
    pub name: String,
}

impl Model for Group {
    fn meta() -> &'static ModelMeta {
        &GROUP_META
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Int(self.id)),
            ("name", Value::String(self.name.clone())),
        ]
    }

    fn from_row(row: &Row) -> PathconvResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

/// Returns a store under `alias` holding the fixture records.
pub fn seeded_store(alias: &str) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new(alias));
    for (id, username) in [(12, "Foo"), (13, "Bar")] {
        store.insert(&User {
            id,
            username: username.to_string(),
        });
    }
    store.insert(&Group {
        id: 123,
        name: "Foo".to_string(),
    });
    store
}

/// Returns a registry with `auth.User` and `auth.Group`.
pub fn model_registry() -> Arc<ModelRegistry> {
    let mut models = ModelRegistry::new();
    models.register::<User>().register::<Group>();
    Arc::new(models)
}

/// Returns seeded `default` and `replica` stores and the [`Databases`]
/// holding them.
pub fn seeded_databases() -> (Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<Databases>) {
    let default = seeded_store("default");
    let replica = seeded_store("replica");
    let databases = Databases::new().with(default.clone()).with(replica.clone());
    (default, replica, Arc::new(databases))
}

/// Returns a converter registry with the built-ins plus `model` and `object`
/// over the fixture models, examples checked per `settings`.
///
/// # Panics
///
/// Panics if a converter fails to register or fails its examples.
pub async fn converter_registry(settings: ConverterSettings, databases: Arc<Databases>) -> ConverterRegistry {
    let mut registry = ConverterRegistry::checked_builtins(settings)
        .await
        .expect("built-in converters register");
    registry
        .register_models(model_registry(), databases)
        .await
        .expect("model converters register");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathconv_db::QuerySet;

    #[tokio::test]
    async fn test_seeded_records() {
        let store = seeded_store("default");
        let users = QuerySet::<User>::new(store.clone()).all().await.unwrap();
        assert_eq!(users.len(), 2);
        let group = QuerySet::<Group>::new(store)
            .filter("name", "Foo")
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(group.id, 123);
    }

    #[tokio::test]
    async fn test_registries() {
        assert_eq!(model_registry().len(), 2);
        let (_, _, databases) = seeded_databases();
        assert_eq!(databases.aliases(), vec!["default", "replica"]);
        let registry = converter_registry(ConverterSettings::default(), databases).await;
        assert!(registry.contains("model"));
        assert!(registry.contains("object"));
    }
}
