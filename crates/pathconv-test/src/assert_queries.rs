//! Query counting assertions.
//!
//! [`assert_num_queries`] resets the counter of an [`InMemoryStore`], runs an
//! async closure and asserts how many queries it issued. This is how lazy
//! loading and batching guarantees are tested.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pathconv_test::assert_queries::assert_num_queries;
//! use pathconv_test::fixtures::{seeded_store, User};
//! use pathconv_db::{LazyObject, ObjectStore, QuerySet};
//! use std::sync::Arc;
//!
//! async fn example() {
//!     let store = seeded_store("default");
//!     let user = LazyObject::new(QuerySet::<User>::new(store.clone()), "pk", 12_i64);
//!
//!     assert_num_queries(&store, 1, || async {
//!         user.get().await.unwrap();
//!         user.get().await.unwrap();
//!     })
//!     .await;
//! }
//! ```

use std::future::Future;

use pathconv_db::InMemoryStore;

/// Asserts that exactly `expected_count` queries hit `store` while the
/// closure runs.
///
/// # Panics
///
/// Panics if the count differs.
pub async fn assert_num_queries<F, Fut>(store: &InMemoryStore, expected_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    store.reset_queries();
    f().await;
    let actual = store.query_count();
    assert_eq!(
        actual,
        expected_count,
        "Expected {expected_count} queries, but {actual} were executed: {:?}",
        store.queries()
    );
}

/// Asserts that at most `max_count` queries hit `store` while the closure
/// runs.
///
/// # Panics
///
/// Panics if more queries ran.
pub async fn assert_max_queries<F, Fut>(store: &InMemoryStore, max_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    store.reset_queries();
    f().await;
    let actual = store.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} queries, but {actual} were executed: {:?}",
        store.queries()
    );
}
