//! Single-or-multiple declarations.
//!
//! Converter metadata such as examples or accepted types may be declared as a
//! single item or as a list. [`OneOrMany`] accepts both and always yields a
//! `Vec`, so downstream code only ever handles lists.

/// A single value or a list of values.
///
/// # Examples
///
/// ```
/// use pathconv_core::utils::OneOrMany;
///
/// let one: OneOrMany<&str> = "2023-01-21".into();
/// assert_eq!(one.into_vec(), vec!["2023-01-21"]);
///
/// let many: OneOrMany<&str> = ["a", "b"].into();
/// assert_eq!(many.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    /// Exactly one value.
    One(T),
    /// Any number of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Converts into a `Vec`, preserving declaration order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

impl<T, const N: usize> From<[T; N]> for OneOrMany<T> {
    fn from(values: [T; N]) -> Self {
        Self::Many(values.into())
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
