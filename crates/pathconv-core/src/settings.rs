//! Settings for pathconv.
//!
//! [`Settings`] holds the configuration of the converter registry, the
//! databases lazy objects are loaded from, and the overlap auditor.
//! [`SETTINGS`] is the globally-accessible, configure-once instance.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The engine name of the built-in in-memory store.
pub const MEMORY_ENGINE: &str = "pathconv.db.backends.memory";

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The store engine.
    pub engine: String,
    /// The database name.
    pub name: String,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: MEMORY_ENGINE.to_string(),
            name: "default".to_string(),
            options: HashMap::new(),
        }
    }
}

/// How a lazily loading converter checks its key before handing out a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LazyProbeMode {
    /// No check at all.
    None,
    /// Validate that the lookup field exists on the model. Never queries.
    #[default]
    Field,
    /// Run an existence query and reject the fragment when nothing matches.
    Exists,
}

impl fmt::Display for LazyProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Field => write!(f, "field"),
            Self::Exists => write!(f, "exists"),
        }
    }
}

impl FromStr for LazyProbeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "field" => Ok(Self::Field),
            "exists" => Ok(Self::Exists),
            other => Err(format!("unknown lazy probe mode: {other}")),
        }
    }
}

/// Converter registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterSettings {
    /// Run the round-trip self-test on every declared example at registration.
    pub check_examples: bool,
    /// The fragment nullable converters render for the absent value.
    pub null_token: String,
    /// The probe lazily loading object converters use by default.
    pub lazy_probe: LazyProbeMode,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            check_examples: true,
            null_token: "null".to_string(),
            lazy_probe: LazyProbeMode::Field,
        }
    }
}

/// URL overlap auditor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapSettings {
    /// Upper bound on explored product-automaton states per pattern pair.
    pub max_states: usize,
}

impl Default for OverlapSettings {
    fn default() -> Self {
        Self {
            max_states: 100_000,
        }
    }
}

/// The complete set of pathconv settings.
///
/// # Examples
///
/// ```
/// use pathconv_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.converters.null_token, "null");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Database ─────────────────────────────────────────────────────

    /// Database configurations, keyed by alias (e.g. "default").
    pub databases: HashMap<String, DatabaseSettings>,

    // ── Middleware ───────────────────────────────────────────────────

    /// Ordered list of view middleware names.
    pub middleware: Vec<String>,

    // ── Converters ───────────────────────────────────────────────────

    /// Converter registry options.
    pub converters: ConverterSettings,

    /// Overlap auditor options.
    pub overlap: OverlapSettings,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert("default".to_string(), DatabaseSettings::default());

        Self {
            debug: true,
            databases,
            middleware: vec!["pathconv.middleware.QueryBatcherMiddleware".to_string()],
            converters: ConverterSettings::default(),
            overlap: OverlapSettings::default(),
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup, then use
/// [`get`](LazySettings::get) to access the settings.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
