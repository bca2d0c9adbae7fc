//! Build configuration and the clock used by generated defaults.
//!
//! Resource building is a pure function of its input except for one thing:
//! default generators that depend on the current date. Those read time only
//! through the [`Clock`] held by a [`BuildContext`], so tests can pin it with
//! a [`FixedClock`].
//!
//! ```rust
//! use cloud_resource_schemas::config::{BuildContext, FixedClock, UnknownKeyPolicy, ValidationConfig};
//! use chrono::{TimeZone, Utc};
//!
//! let context = BuildContext::new()
//!     .with_config(ValidationConfig {
//!         unknown_keys: UnknownKeyPolicy::Reject,
//!         ..ValidationConfig::default()
//!     })
//!     .with_clock(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()));
//! assert_eq!(context.config().unknown_keys, UnknownKeyPolicy::Reject);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// How unknown input keys are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Each schema's own strict/lax flag decides
    #[default]
    SchemaDefault,
    /// Reject unknown keys for every schema
    Reject,
    /// Ignore unknown keys for every schema
    Ignore,
}

/// Validation options shared by every resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Unknown-key handling override
    pub unknown_keys: UnknownKeyPolicy,
    /// Whether `":name"` symbol-style keys are normalized to `name`
    pub accept_symbol_keys: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            unknown_keys: UnknownKeyPolicy::SchemaDefault,
            accept_symbol_keys: true,
        }
    }
}

impl ValidationConfig {
    /// Load a configuration from a JSON document.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Source of the current time for generated defaults.
pub trait Clock: Debug + Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Clock reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything a build call needs besides the raw attributes.
#[derive(Debug, Clone)]
pub struct BuildContext {
    config: ValidationConfig,
    clock: Arc<dyn Clock>,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            config: ValidationConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl BuildContext {
    /// Default configuration with the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
