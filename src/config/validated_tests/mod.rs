//! Tests for validated configuration.

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::{BrokerEndpoints, ValidatedConfig};

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["calendar-queue"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

/// CLI args covering every required field
const REQUIRED: &[&str] = &[
    "--calendar-url",
    "https://calendar.example.com/v3",
    "--queue",
    "calendar",
    "--error-queue",
    "calendar-errors",
    "--broker",
    "memory://",
];

/// CLI args covering every required field, plus `extra`
fn cli_with(extra: &[&str]) -> Cli {
    let mut args = REQUIRED.to_vec();
    args.extend(extra);
    cli(&args)
}

mod brokers;
mod loading;
mod pacing;
mod precedence;
mod required;
