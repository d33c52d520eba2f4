use std::time::Duration;

use super::*;

#[test]
fn defaults_apply_without_toml() {
    let config = ValidatedConfig::from_raw(&cli(REQUIRED), None).unwrap();
    let pacing = &config.pacing;

    assert!(pacing.pacing.adaptive);
    assert_eq!(pacing.pacing.base_delay, Duration::from_millis(500));
    assert_eq!(pacing.pacing.max_delay, Duration::from_secs(10));
    assert!((pacing.pacing.exponent_base - 2.0).abs() < f64::EPSILON);
    assert_eq!(pacing.backoff.base_delay, Duration::from_secs(120));
    assert_eq!(pacing.backoff.max_delay, Duration::from_secs(3600));
    assert!((pacing.backoff.exponent_base - 2.0).abs() < f64::EPSILON);
    assert_eq!(pacing.unreachable_cooldown, Duration::from_secs(60));
}

#[test]
fn toml_values_are_used() {
    let toml = toml(
        r"
        [pacing]
        base_delay_ms = 250
        max_delay_ms = 4000
        exponent_base = 1.5

        [backoff]
        base_delay_secs = 60
        max_delay_secs = 86400
        exponent_base = 3.0
        ",
    );

    let config = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml)).unwrap();
    let pacing = &config.pacing;

    assert_eq!(pacing.pacing.base_delay, Duration::from_millis(250));
    assert_eq!(pacing.pacing.max_delay, Duration::from_secs(4));
    assert!((pacing.pacing.exponent_base - 1.5).abs() < f64::EPSILON);
    assert_eq!(pacing.backoff.base_delay, Duration::from_secs(60));
    assert_eq!(pacing.backoff.max_delay, Duration::from_secs(86400));
    assert!((pacing.backoff.exponent_base - 3.0).abs() < f64::EPSILON);
}

#[test]
fn cli_flag_disables_adaptive_pacing() {
    let config = ValidatedConfig::from_raw(&cli_with(&["--no-adaptive-pacing"]), None).unwrap();

    assert!(!config.pacing.pacing.adaptive);
}

#[test]
fn toml_disabled_cannot_be_undone_by_cli() {
    let toml = toml(
        r"
        [pacing]
        disabled = true
        ",
    );

    let config = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml)).unwrap();

    assert!(!config.pacing.pacing.adaptive);
}

mod exponent_validation {
    use super::*;

    fn with_toml(content: &str) -> Result<ValidatedConfig, ConfigError> {
        ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml(content)))
    }

    #[test]
    fn pacing_exponent_of_one_is_rejected() {
        let result = with_toml("[pacing]\nexponent_base = 1.0");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidExponent {
                field: "pacing.exponent_base",
                ..
            })
        ));
    }

    #[test]
    fn backoff_exponent_below_one_is_rejected() {
        let result = with_toml("[backoff]\nexponent_base = 0.5");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidExponent {
                field: "backoff.exponent_base",
                ..
            })
        ));
    }

    #[test]
    fn infinite_exponent_is_rejected() {
        let result = with_toml("[backoff]\nexponent_base = inf");

        assert!(matches!(result, Err(ConfigError::InvalidExponent { .. })));
    }

    #[test]
    fn nan_exponent_is_rejected() {
        let result = with_toml("[pacing]\nexponent_base = nan");

        assert!(matches!(result, Err(ConfigError::InvalidExponent { .. })));
    }

    #[test]
    fn exponent_just_above_one_is_accepted() {
        let result = with_toml("[pacing]\nexponent_base = 1.01");

        assert!(result.is_ok());
    }
}

mod delay_bounds {
    use super::*;

    #[test]
    fn pacing_max_below_base_is_rejected() {
        let toml = toml("[pacing]\nbase_delay_ms = 2000\nmax_delay_ms = 1000");

        let result = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidDelay {
                field: "pacing.max_delay_ms",
                ..
            })
        ));
    }

    #[test]
    fn backoff_base_above_default_max_is_rejected() {
        let toml = toml("[backoff]\nbase_delay_secs = 7200");

        let result = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidDelay {
                field: "backoff.max_delay_secs",
                ..
            })
        ));
    }

    #[test]
    fn equal_bounds_are_accepted() {
        let toml = toml("[pacing]\nbase_delay_ms = 1000\nmax_delay_ms = 1000");

        let result = ValidatedConfig::from_raw(&cli(REQUIRED), Some(&toml));

        assert!(result.is_ok());
    }
}
