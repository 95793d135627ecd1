//! # pathconv-test
//!
//! Testing helpers for applications built on pathconv.
//!
//! - [`fixtures`] - `auth.User` and `auth.Group` fixture models with seeded
//!   stores
//! - [`assert_queries`] - Query-count assertions against [`InMemoryStore`]s
//! - [`converters`] - The round-trip check for converter examples
//! - [`client`] - A test client driving a [`Dispatcher`] through axum
//!
//! [`InMemoryStore`]: pathconv_db::InMemoryStore
//! [`Dispatcher`]: pathconv_urls::Dispatcher

pub mod assert_queries;
pub mod client;
pub mod converters;
pub mod fixtures;

pub use assert_queries::{assert_max_queries, assert_num_queries};
pub use client::{TestClient, TestResponse};
pub use converters::{assert_all_examples_valid, assert_valid_converter_example};
pub use fixtures::{Group, User};
