//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::consumer::{BackoffPolicy, Pacing, PacingPolicy};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Where the queues live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEndpoints {
    /// In-process queues (`memory://`).
    Memory,
    /// Redis servers (`redis://`, `rediss://`), tried in order.
    Redis(Vec<Url>),
}

impl fmt::Display for BrokerEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis(addresses) => {
                // Host and port only; addresses may carry credentials.
                let hosts: Vec<String> = addresses
                    .iter()
                    .map(|url| {
                        format!(
                            "{}:{}",
                            url.host_str().unwrap_or("localhost"),
                            url.port().unwrap_or(6379)
                        )
                    })
                    .collect();
                write!(f, "redis [{}]", hosts.join(", "))
            }
        }
    }
}

/// Fully validated configuration ready for use by the application.
///
/// This struct represents a complete, validated configuration where all
/// required fields are present and all values have been validated.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Calendar API root URL (required)
    pub calendar_url: Url,

    /// Work queue name (required)
    pub queue: String,

    /// Error queue name (required)
    pub error_queue: String,

    /// Broker transport and addresses (required)
    pub brokers: BrokerEndpoints,

    /// Redis consumer group
    pub consumer_group: String,

    /// Consumer name within the group
    pub consumer_name: String,

    /// Ingress listen address
    pub listen: SocketAddr,

    /// Health endpoint address, if enabled
    pub health_listen: Option<SocketAddr>,

    /// Pacing and backoff configuration
    pub pacing: Pacing,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pacing = &self.pacing.pacing;
        let backoff = &self.pacing.backoff;

        write!(
            f,
            "Config {{ calendar: {}, queue: {}, error_queue: {}, brokers: {}, listen: {}, \
             health: {}, pacing: {} {}ms..{}ms x{}, backoff: {}s..{}s x{} }}",
            self.calendar_url,
            self.queue,
            self.error_queue,
            self.brokers,
            self.listen,
            self.health_listen
                .map_or_else(|| "off".to_string(), |addr| addr.to_string()),
            if pacing.adaptive { "adaptive" } else { "fixed" },
            pacing.base_delay.as_millis(),
            pacing.max_delay.as_millis(),
            pacing.exponent_base,
            backoff.base_delay.as_secs(),
            backoff.max_delay.as_secs(),
            backoff.exponent_base,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields are missing (calendar URL, queue names, brokers)
    /// - The calendar URL or a broker address is invalid
    /// - Broker addresses mix transports
    /// - An exponent base is not greater than 1
    /// - A maximum delay is below its base delay
    /// - A listen address is invalid, or the health endpoint reuses the ingress address
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let calendar_url = Self::resolve_calendar_url(cli, toml)?;

        let queue = resolve_name(
            cli.queue.as_deref(),
            toml.and_then(|t| t.queue.name.as_deref()),
            field::QUEUE,
            "Use --queue or set queue.name in config file",
        )?;

        let error_queue = resolve_name(
            cli.error_queue.as_deref(),
            toml.and_then(|t| t.queue.error_name.as_deref()),
            field::ERROR_QUEUE,
            "Use --error-queue or set queue.error_name in config file",
        )?;

        let brokers = Self::resolve_brokers(cli, toml)?;

        let consumer_group = non_empty(
            toml.and_then(|t| t.queue.consumer_group.as_deref())
                .unwrap_or(defaults::CONSUMER_GROUP),
            field::CONSUMER_GROUP,
        )?;

        let consumer_name = non_empty(
            toml.and_then(|t| t.queue.consumer_name.as_deref())
                .unwrap_or(defaults::CONSUMER_NAME),
            field::CONSUMER_NAME,
        )?;

        let listen = Self::resolve_listen(cli, toml)?;
        let health_listen = Self::resolve_health_listen(cli, toml, listen)?;

        let pacing = Pacing::new(
            Self::build_pacing_policy(cli, toml)?,
            Self::build_backoff_policy(toml)?,
        );

        // OR semantics: either source can enable debug logging
        let verbose = cli.verbose || toml.is_some_and(|t| t.debug);

        Ok(Self {
            calendar_url,
            queue,
            error_queue,
            brokers,
            consumer_group,
            consumer_name,
            listen,
            health_listen,
            pacing,
            verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_calendar_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        let url_str = cli
            .calendar_url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.calendar.root_url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::CALENDAR_URL,
                    "Use --calendar-url or set calendar.root_url in config file",
                )
            })?;

        let url = Url::parse(url_str).map_err(|e| ConfigError::InvalidUrl {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: url_str.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        Ok(url)
    }

    fn resolve_brokers(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<BrokerEndpoints, ConfigError> {
        // CLI list replaces the TOML list entirely
        let addresses: &[String] = if cli.brokers.is_empty() {
            toml.map(|t| t.queue.brokers.as_slice()).unwrap_or_default()
        } else {
            &cli.brokers
        };

        if addresses.is_empty() {
            return Err(ConfigError::missing(
                field::BROKERS,
                "Use --broker or set queue.brokers in config file",
            ));
        }

        let mut memory = false;
        let mut redis = Vec::new();

        for address in addresses {
            let url = Url::parse(address).map_err(|e| ConfigError::InvalidBroker {
                address: address.clone(),
                reason: e.to_string(),
            })?;

            match url.scheme() {
                "memory" => memory = true,
                "redis" | "rediss" => redis.push(url),
                other => {
                    return Err(ConfigError::InvalidBroker {
                        address: address.clone(),
                        reason: format!("unsupported scheme '{other}'"),
                    });
                }
            }
        }

        match (memory, redis.is_empty()) {
            (true, true) => Ok(BrokerEndpoints::Memory),
            (false, false) => Ok(BrokerEndpoints::Redis(redis)),
            _ => Err(ConfigError::MixedBrokers),
        }
    }

    fn resolve_listen(cli: &Cli, toml: Option<&TomlConfig>) -> Result<SocketAddr, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let value = cli
            .listen
            .as_deref()
            .or_else(|| toml.and_then(|t| t.server.listen.as_deref()))
            .unwrap_or(defaults::LISTEN);

        parse_listen(value)
    }

    fn resolve_health_listen(
        cli: &Cli,
        toml: Option<&TomlConfig>,
        listen: SocketAddr,
    ) -> Result<Option<SocketAddr>, ConfigError> {
        let Some(value) = cli
            .health_listen
            .as_deref()
            .or_else(|| toml.and_then(|t| t.server.health_listen.as_deref()))
        else {
            return Ok(None);
        };

        let addr = parse_listen(value)?;
        if addr == listen {
            return Err(ConfigError::InvalidListen {
                value: value.to_string(),
                reason: "health endpoint must not share the ingress address".to_string(),
            });
        }
        Ok(Some(addr))
    }

    fn build_pacing_policy(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<PacingPolicy, ConfigError> {
        let pacing = toml.map(|t| &t.pacing);

        // OR semantics: either source can disable adaptive pacing
        let disabled = cli.no_adaptive_pacing || pacing.is_some_and(|p| p.disabled);

        let base_ms = pacing
            .and_then(|p| p.base_delay_ms)
            .unwrap_or(defaults::PACING_BASE_DELAY_MS);

        let max_ms = pacing
            .and_then(|p| p.max_delay_ms)
            .unwrap_or(defaults::PACING_MAX_DELAY_MS);

        let exponent_base = validate_exponent(
            pacing
                .and_then(|p| p.exponent_base)
                .unwrap_or(defaults::PACING_EXPONENT_BASE),
            field::PACING_EXPONENT_BASE,
        )?;

        if max_ms < base_ms {
            return Err(ConfigError::InvalidDelay {
                field: field::PACING_MAX_DELAY,
                reason: format!("max_delay_ms ({max_ms}) must be >= base_delay_ms ({base_ms})"),
            });
        }

        Ok(PacingPolicy::new()
            .with_adaptive(!disabled)
            .with_base_delay(Duration::from_millis(base_ms))
            .with_max_delay(Duration::from_millis(max_ms))
            .with_exponent_base(exponent_base))
    }

    fn build_backoff_policy(toml: Option<&TomlConfig>) -> Result<BackoffPolicy, ConfigError> {
        let backoff = toml.map(|t| &t.backoff);

        let base_secs = backoff
            .and_then(|b| b.base_delay_secs)
            .unwrap_or(defaults::BACKOFF_BASE_DELAY_SECS);

        let max_secs = backoff
            .and_then(|b| b.max_delay_secs)
            .unwrap_or(defaults::BACKOFF_MAX_DELAY_SECS);

        let exponent_base = validate_exponent(
            backoff
                .and_then(|b| b.exponent_base)
                .unwrap_or(defaults::BACKOFF_EXPONENT_BASE),
            field::BACKOFF_EXPONENT_BASE,
        )?;

        if max_secs < base_secs {
            return Err(ConfigError::InvalidDelay {
                field: field::BACKOFF_MAX_DELAY,
                reason: format!(
                    "max_delay_secs ({max_secs}) must be >= base_delay_secs ({base_secs})"
                ),
            });
        }

        Ok(BackoffPolicy::new()
            .with_base_delay(Duration::from_secs(base_secs))
            .with_max_delay(Duration::from_secs(max_secs))
            .with_exponent_base(exponent_base))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn resolve_name(
    cli: Option<&str>,
    toml: Option<&str>,
    field: &'static str,
    hint: &'static str,
) -> Result<String, ConfigError> {
    let value = cli
        .or(toml)
        .ok_or_else(|| ConfigError::missing(field, hint))?;
    non_empty(value, field)
}

fn non_empty(value: &str, field: &'static str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    Ok(value.to_string())
}

fn parse_listen(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidListen {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn validate_exponent(value: f64, field: &'static str) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidExponent { field, value })
    }
}
