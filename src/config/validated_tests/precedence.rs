use super::*;

const FULL_TOML: &str = r#"
    debug = false

    [calendar]
    root_url = "https://toml.example.com"

    [queue]
    name = "toml-queue"
    error_name = "toml-errors"
    brokers = ["redis://toml-host:6379"]

    [server]
    listen = "127.0.0.1:7000"
"#;

#[test]
fn cli_overrides_toml_values() {
    let toml = toml(FULL_TOML);
    let cli = cli(&[
        "--calendar-url",
        "https://cli.example.com",
        "--queue",
        "cli-queue",
        "--error-queue",
        "cli-errors",
        "--listen",
        "127.0.0.1:9000",
    ]);

    let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

    assert_eq!(config.calendar_url.as_str(), "https://cli.example.com/");
    assert_eq!(config.queue, "cli-queue");
    assert_eq!(config.error_queue, "cli-errors");
    assert_eq!(config.listen.to_string(), "127.0.0.1:9000");
}

#[test]
fn toml_fills_in_what_cli_leaves_out() {
    let toml = toml(FULL_TOML);

    let config = ValidatedConfig::from_raw(&cli(&["--queue", "cli-queue"]), Some(&toml)).unwrap();

    assert_eq!(config.queue, "cli-queue");
    assert_eq!(config.error_queue, "toml-errors");
    assert_eq!(config.listen.to_string(), "127.0.0.1:7000");
}

#[test]
fn cli_brokers_replace_toml_brokers() {
    let toml = toml(FULL_TOML);
    let cli = cli(&[
        "--broker",
        "redis://cli-a:6379",
        "--broker",
        "redis://cli-b:6379",
    ]);

    let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

    let BrokerEndpoints::Redis(urls) = config.brokers else {
        panic!("expected redis brokers");
    };
    let hosts: Vec<_> = urls.iter().filter_map(|u| u.host_str()).collect();
    assert_eq!(hosts, ["cli-a", "cli-b"]);
}

#[test]
fn defaults_fill_optional_fields() {
    let config = ValidatedConfig::from_raw(&cli(REQUIRED), None).unwrap();

    assert_eq!(config.listen.to_string(), "0.0.0.0:8080");
    assert_eq!(config.consumer_group, "calendar-queue");
    assert_eq!(config.consumer_name, "consumer-1");
    assert!(!config.verbose);
}

#[test]
fn invalid_listen_address_returns_error() {
    let result = ValidatedConfig::from_raw(&cli_with(&["--listen", "localhost"]), None);

    assert!(matches!(result, Err(ConfigError::InvalidListen { .. })));
}

mod verbose {
    use super::*;

    #[test]
    fn cli_flag_enables_verbose() {
        let config = ValidatedConfig::from_raw(&cli_with(&["--verbose"]), None).unwrap();

        assert!(config.verbose);
    }

    #[test]
    fn toml_debug_enables_verbose() {
        let toml = toml("debug = true");

        let config = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml)).unwrap();

        assert!(config.verbose);
    }
}

#[test]
fn display_summarizes_config() {
    let config = ValidatedConfig::from_raw(&cli(REQUIRED), None).unwrap();

    let shown = config.to_string();

    assert!(shown.contains("calendar: https://calendar.example.com/v3"));
    assert!(shown.contains("queue: calendar"));
    assert!(shown.contains("brokers: memory"));
    assert!(shown.contains("pacing: adaptive 500ms..10000ms x2"));
    assert!(shown.contains("backoff: 120s..3600s x2"));
}

#[test]
fn health_endpoint_is_off_by_default() {
    let config = ValidatedConfig::from_raw(&cli_with(&[]), None).unwrap();

    assert_eq!(config.health_listen, None);
    assert!(config.to_string().contains("health: off"));
}

#[test]
fn cli_health_listen_overrides_toml() {
    let toml = toml(
        r#"
        [server]
        health_listen = "127.0.0.1:7001"
        "#,
    );

    let from_toml = ValidatedConfig::from_raw(&cli_with(&[]), Some(&toml)).unwrap();
    let from_cli = ValidatedConfig::from_raw(
        &cli_with(&["--health-listen", "127.0.0.1:9001"]),
        Some(&toml),
    )
    .unwrap();

    assert_eq!(from_toml.health_listen.unwrap().to_string(), "127.0.0.1:7001");
    assert_eq!(from_cli.health_listen.unwrap().to_string(), "127.0.0.1:9001");
}

#[test]
fn health_listen_on_ingress_address_returns_error() {
    let result = ValidatedConfig::from_raw(
        &cli_with(&["--listen", "127.0.0.1:9000", "--health-listen", "127.0.0.1:9000"]),
        None,
    );

    assert!(matches!(result, Err(ConfigError::InvalidListen { .. })));
}
