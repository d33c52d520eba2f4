use std::io::Write;

use tempfile::NamedTempFile;

use super::super::write_default_config;
use super::*;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_reads_config_file() {
    let file = config_file(
        r#"
        [calendar]
        root_url = "https://calendar.example.com"

        [queue]
        name = "calendar"
        error_name = "calendar-errors"
        brokers = ["memory://"]
        "#,
    );
    let path = file.path().to_str().unwrap();

    let config = ValidatedConfig::load(&cli(&["--config", path])).unwrap();

    assert_eq!(config.queue, "calendar");
    assert_eq!(config.brokers, BrokerEndpoints::Memory);
}

#[test]
fn load_without_config_uses_cli_only() {
    let config = ValidatedConfig::load(&cli(REQUIRED)).unwrap();

    assert_eq!(config.error_queue, "calendar-errors");
}

#[test]
fn load_missing_file_returns_error() {
    let result = ValidatedConfig::load(&cli(&["--config", "/nonexistent/calendar-queue.toml"]));

    assert!(matches!(result, Err(ConfigError::FileRead { .. })));
}

#[test]
fn load_invalid_toml_returns_error() {
    let file = config_file("[queue\nname = ");
    let path = file.path().to_str().unwrap();

    let result = ValidatedConfig::load(&cli(&["--config", path]));

    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn written_template_loads_once_required_fields_are_given() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calendar-queue.toml");

    write_default_config(&path).unwrap();

    let mut args = vec!["--config", path.to_str().unwrap()];
    args.extend(REQUIRED);
    let config = ValidatedConfig::load(&cli(&args)).unwrap();
    assert_eq!(config.queue, "calendar");
}

#[test]
fn write_to_missing_directory_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("calendar-queue.toml");

    let result = write_default_config(&path);

    assert!(matches!(result, Err(ConfigError::FileWrite { .. })));
}
