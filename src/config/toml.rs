//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Calendar API section
    #[serde(default)]
    pub calendar: CalendarSection,

    /// Queue and broker section
    #[serde(default)]
    pub queue: QueueSection,

    /// Ingress server section
    #[serde(default)]
    pub server: ServerSection,

    /// Pacing between processed messages
    #[serde(default)]
    pub pacing: PacingSection,

    /// Backoff after rate limiting
    #[serde(default)]
    pub backoff: BackoffSection,
}

/// Calendar API section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarSection {
    /// Root URL every queued path is appended to
    pub root_url: Option<String>,
}

/// Queue and broker section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    /// Work queue name
    pub name: Option<String>,

    /// Error queue name
    pub error_name: Option<String>,

    /// Broker addresses, tried in order
    #[serde(default)]
    pub brokers: Vec<String>,

    /// Redis consumer group
    pub consumer_group: Option<String>,

    /// Consumer name within the group
    pub consumer_name: Option<String>,
}

/// Ingress server section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Listen address
    pub listen: Option<String>,

    /// Health endpoint address; no health endpoint when unset
    pub health_listen: Option<String>,
}

/// Pacing section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    /// Always use the base delay
    #[serde(default)]
    pub disabled: bool,

    /// Base delay in milliseconds
    pub base_delay_ms: Option<u64>,

    /// Maximum delay in milliseconds
    pub max_delay_ms: Option<u64>,

    /// Exponent base
    pub exponent_base: Option<f64>,
}

/// Backoff section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffSection {
    /// Base delay in seconds
    pub base_delay_secs: Option<u64>,

    /// Maximum delay in seconds
    pub max_delay_secs: Option<u64>,

    /// Exponent base
    pub exponent_base: Option<f64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# calendar-queue configuration file

# Enable debug logging (same as --verbose)
# debug = false

[calendar]
# Root URL of the calendar API (required)
# root_url = "https://www.googleapis.com/calendar/v3"

[queue]
# Work queue name (required)
# name = "calendar"

# Queue receiving requests the calendar API rejected (required)
# error_name = "calendar-errors"

# Broker addresses, tried in order (required)
# All entries must use the same transport: memory:// or redis://
# Note: --broker CLI flags REPLACE this list entirely (not merged)
# brokers = ["redis://127.0.0.1:6379"]

# Redis consumer group and consumer name
# consumer_group = "calendar-queue"
# consumer_name = "consumer-1"

[server]
# Address the ingress server listens on (default: 0.0.0.0:8080)
# listen = "0.0.0.0:8080"

# Address of a separate health endpoint answering GET /health (disabled by default)
# health_listen = "0.0.0.0:8081"

[pacing]
# Always wait the base delay, ignoring rate limiting (same as --no-adaptive-pacing)
# disabled = false

# Delay between processed messages in milliseconds (default: 500)
# base_delay_ms = 500

# Upper bound for the pacing delay in milliseconds (default: 10000)
# max_delay_ms = 10000

# Growth factor per rate-limited call, must be greater than 1 (default: 2.0)
# exponent_base = 2.0

[backoff]
# After the n-th rate-limited call (counting that call) the consumer waits
# base_delay_secs + 30 minutes x exponent_base^n, capped at max_delay_secs.
# With the defaults every rate limit, the first included, waits the full hour.

# Offset added to every backoff in seconds (default: 120)
# base_delay_secs = 120

# Upper bound for the backoff in seconds (default: 3600)
# max_delay_secs = 3600

# Growth factor per rate-limited call, must be greater than 1 (default: 2.0)
# exponent_base = 2.0
"#
    .to_string()
}
