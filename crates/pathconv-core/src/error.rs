//! Core error types for pathconv.
//!
//! [`PathconvError`] covers converter rejections, lookup failures, registry
//! misconfiguration and failed converter self-tests. Each variant maps to the
//! HTTP status a routing layer would answer with.

use thiserror::Error;

/// The primary error type for pathconv.
#[derive(Error, Debug)]
pub enum PathconvError {
    // ── Conversion ───────────────────────────────────────────────────

    /// A path fragment or value was rejected by a converter.
    ///
    /// The resolver treats this as "try the next pattern".
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No URL pattern matched, or a lazily loaded object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    // ── ORM errors ───────────────────────────────────────────────────

    /// A query expected exactly one result but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A query expected exactly one result but found several.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A lookup referenced a field the model does not have.
    #[error("Field error: {0}")]
    FieldError(String),

    /// A generic store error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A converter, route or model was declared incorrectly.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A declared converter example failed the round-trip self-test.
    #[error("Converter '{converter}' failed on example '{example}': {reason}")]
    ConverterCheckFailed {
        /// The registered converter name.
        converter: String,
        /// The example fragment that failed.
        example: String,
        /// What went wrong.
        reason: String,
    },

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PathconvError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest` -> 400
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::MultipleObjectsReturned(_)
            | Self::FieldError(_)
            | Self::DatabaseError(_)
            | Self::ImproperlyConfigured(_)
            | Self::ConfigurationError(_)
            | Self::ConverterCheckFailed { .. }
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` if this error means a converter did not accept its input.
    ///
    /// URL resolution moves on to the next candidate pattern for rejections
    /// and propagates every other error.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}

impl From<serde_json::Error> for PathconvError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, PathconvError>`.
pub type PathconvResult<T> = Result<T, PathconvError>;
