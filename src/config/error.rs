//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Missing required field that must be provided by CLI or config file.
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired {
        /// Name of the missing field
        field: &'static str,
        /// Hint for how to provide the value
        hint: &'static str,
    },

    /// A field that must not be empty was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the field
        field: &'static str,
    },

    /// Invalid URL provided.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The invalid URL string
        url: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Broker address that cannot be used.
    #[error("Invalid broker address '{address}': {reason}")]
    InvalidBroker {
        /// The offending address
        address: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Broker list mixes transports.
    #[error("Broker addresses must all use the same transport (memory:// or redis://)")]
    MixedBrokers,

    /// Invalid listen address.
    #[error("Invalid listen address '{value}': {reason}")]
    InvalidListen {
        /// The invalid address
        value: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Exponent base that is not a finite number greater than 1.
    #[error("Invalid {field}: {value} (must be a finite number greater than 1)")]
    InvalidExponent {
        /// Name of the field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// Inconsistent delay bounds.
    #[error("Invalid delay for {field}: {reason}")]
    InvalidDelay {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },
}

/// Well-known field names for configuration errors.
///
/// Use these constants for compile-time safety when matching field names.
pub mod field {
    /// The calendar root URL.
    pub const CALENDAR_URL: &str = "calendar.root_url";
    /// The work queue name.
    pub const QUEUE: &str = "queue.name";
    /// The error queue name.
    pub const ERROR_QUEUE: &str = "queue.error_name";
    /// The broker address list.
    pub const BROKERS: &str = "queue.brokers";
    /// The consumer group.
    pub const CONSUMER_GROUP: &str = "queue.consumer_group";
    /// The consumer name.
    pub const CONSUMER_NAME: &str = "queue.consumer_name";
    /// The pacing exponent base.
    pub const PACING_EXPONENT_BASE: &str = "pacing.exponent_base";
    /// The maximum pacing delay.
    pub const PACING_MAX_DELAY: &str = "pacing.max_delay_ms";
    /// The backoff exponent base.
    pub const BACKOFF_EXPONENT_BASE: &str = "backoff.exponent_base";
    /// The maximum backoff delay.
    pub const BACKOFF_MAX_DELAY: &str = "backoff.max_delay_secs";
}

impl ConfigError {
    /// Creates a `MissingRequired` error for a required field.
    #[must_use]
    pub const fn missing(field: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { field, hint }
    }
}
