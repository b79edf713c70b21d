//! Tests for retry and polling validation.

use std::time::Duration;

use super::*;

mod retry {
    use super::*;

    #[test]
    fn zero_attempts_is_rejected() {
        let cli = cli(&["https://example.com", "--retry-max", "0"]);
        let result = ValidatedConfig::from_raw(&cli, None);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                setting: Setting::RetryAttempts,
                ..
            })
        ));
    }

    #[test]
    fn zero_initial_delay_is_rejected() {
        let cli = cli(&["https://example.com", "--retry-delay", "0"]);
        let result = ValidatedConfig::from_raw(&cli, None);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                setting: Setting::RetryDelay,
                ..
            })
        ));
    }

    #[test]
    fn multiplier_below_one_is_rejected() {
        let cli = cli(&["https://example.com"]);
        let toml = toml("[retry]\nmultiplier = 0.5");
        let result = ValidatedConfig::from_raw(&cli, Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { setting: Setting::RetryMultiplier, value, .. }) if value == "0.5"
        ));
    }

    #[test]
    fn infinite_multiplier_is_rejected() {
        let cli = cli(&["https://example.com"]);
        let toml = toml("[retry]\nmultiplier = inf");
        let result = ValidatedConfig::from_raw(&cli, Some(&toml));

        assert_eq!(
            result.unwrap_err().setting(),
            Some(Setting::RetryMultiplier)
        );
    }

    #[test]
    fn max_delay_below_initial_is_rejected() {
        let cli = cli(&["https://example.com", "--retry-delay", "30"]);
        let toml = toml("[retry]\nmax_delay = 10");
        let result = ValidatedConfig::from_raw(&cli, Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { setting: Setting::RetryMaxDelay, reason, .. })
                if reason.contains("30s")
        ));
    }

    #[test]
    fn toml_only_options_applied() {
        let cli = cli(&["https://example.com"]);
        let toml = toml(
            r"
            [retry]
            max_delay = 120
            multiplier = 1.5
        ",
        );
        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.retry_policy.max_delay, Duration::from_secs(120));
        assert!((config.retry_policy.multiplier - 1.5).abs() < f64::EPSILON);
    }
}

mod polling {
    use super::*;

    #[test]
    fn zero_delay_is_rejected() {
        let cli = cli(&["https://example.com", "--polling-delay", "0"]);
        let result = ValidatedConfig::from_raw(&cli, None);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                setting: Setting::PollingDelay,
                ..
            })
        ));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let cli = cli(&["https://example.com"]);
        let toml = toml("[polling]\nduration = 0");
        let result = ValidatedConfig::from_raw(&cli, Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                setting: Setting::PollingDuration,
                ..
            })
        ));
    }

    #[test]
    fn default_budget() {
        let cli = cli(&["https://example.com"]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        assert_eq!(config.polling.delay, Duration::from_secs(60));
        assert_eq!(config.polling.duration, Duration::from_secs(900));
    }
}

mod display {
    use super::*;

    #[test]
    fn summary_mentions_method_and_url() {
        let cli = cli(&["https://example.com/jobs", "-X", "POST", "--poll"]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();
        let text = config.to_string();

        assert!(text.contains("POST https://example.com/jobs"));
        assert!(text.contains("every 60s for 900s"));
    }

    #[test]
    fn polling_off_summary() {
        let cli = cli(&["https://example.com"]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        assert!(config.to_string().contains("polling: off"));
    }

    #[test]
    fn verbose_flag_carried() {
        let cli = cli(&["https://example.com", "--verbose"]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        assert!(config.verbose);
    }
}
