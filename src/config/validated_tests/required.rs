use super::*;

#[test]
fn all_required_fields_from_cli() {
    let config = ValidatedConfig::from_raw(&cli(REQUIRED), None).unwrap();

    assert_eq!(config.calendar_url.as_str(), "https://calendar.example.com/v3");
    assert_eq!(config.queue, "calendar");
    assert_eq!(config.error_queue, "calendar-errors");
    assert_eq!(config.brokers, BrokerEndpoints::Memory);
}

#[test]
fn missing_calendar_url_returns_error() {
    let cli = cli(&[
        "--queue",
        "calendar",
        "--error-queue",
        "errors",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::MissingRequired {
            field: "calendar.root_url",
            ..
        })
    ));
}

#[test]
fn missing_queue_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "https://calendar.example.com",
        "--error-queue",
        "errors",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::MissingRequired {
            field: "queue.name",
            ..
        })
    ));
}

#[test]
fn missing_error_queue_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "https://calendar.example.com",
        "--queue",
        "calendar",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::MissingRequired {
            field: "queue.error_name",
            ..
        })
    ));
}

#[test]
fn missing_brokers_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "https://calendar.example.com",
        "--queue",
        "calendar",
        "--error-queue",
        "errors",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::MissingRequired {
            field: "queue.brokers",
            ..
        })
    ));
}

#[test]
fn blank_queue_name_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "https://calendar.example.com",
        "--queue",
        "  ",
        "--error-queue",
        "errors",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(
        result,
        Err(ConfigError::Empty {
            field: "queue.name"
        })
    ));
}

#[test]
fn invalid_calendar_url_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "not a url",
        "--queue",
        "calendar",
        "--error-queue",
        "errors",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
}

#[test]
fn non_http_calendar_url_returns_error() {
    let cli = cli(&[
        "--calendar-url",
        "ftp://calendar.example.com",
        "--queue",
        "calendar",
        "--error-queue",
        "errors",
        "--broker",
        "memory://",
    ]);

    let result = ValidatedConfig::from_raw(&cli, None);

    assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
}

#[test]
fn required_fields_from_toml() {
    let toml = toml(
        r#"
        [calendar]
        root_url = "https://calendar.example.com"

        [queue]
        name = "calendar"
        error_name = "calendar-errors"
        brokers = ["redis://127.0.0.1:6379"]
        "#,
    );

    let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

    assert_eq!(config.queue, "calendar");
    assert!(matches!(config.brokers, BrokerEndpoints::Redis(ref urls) if urls.len() == 1));
}
