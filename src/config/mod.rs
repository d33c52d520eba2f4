//! Configuration layer for calendar-queue.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! Required fields without defaults (calendar URL, queue name, error queue
//! name, brokers) must come from one of the two sources.
//!
//! Broker addresses (`--broker`) **replace** the TOML list entirely (not merged).
//!
//! # Boolean Flag Semantics
//!
//! Boolean flags (`--no-adaptive-pacing`, `--verbose`) use OR semantics:
//! - If set `true` in either CLI or TOML, the result is `true`.
//! - Once set `true` in TOML, CLI cannot override to `false`.
//!
//! # TOML-Only Options
//!
//! Pacing and backoff delays, exponent bases, and the Redis consumer
//! group/name are only available in the config file.
//!
//! # Internal Tuning Parameters
//!
//! The following parameters are intentionally not user-configurable:
//! - Calendar API call timeout: 30 seconds
//! - Ingress publish timeout: 10 seconds
//! - Error queue publish timeout: 15 seconds
//! - Cooldown after the calendar API is unreachable: 60 seconds

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{BrokerEndpoints, ValidatedConfig, write_default_config};
