//! Tests for TOML configuration parsing.

use super::toml::{TomlConfig, default_config_template};

mod parsing {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = TomlConfig::parse("").unwrap();

        assert!(config.request.url.is_none());
        assert!(config.request.headers.is_empty());
        assert!(!config.polling.enabled);
    }

    #[test]
    fn parse_request_section() {
        let toml = r#"
            [request]
            url = "https://example.com/jobs"
            method = "PUT"
            data = '{"name": "nightly"}'
            expect = [200, 201]
            client_request_id = "abc"

            [request.headers]
            Content-Type = "application/json"
        "#;

        let config = TomlConfig::parse(toml).unwrap();
        let request = &config.request;

        assert_eq!(request.url.as_deref(), Some("https://example.com/jobs"));
        assert_eq!(request.method.as_deref(), Some("PUT"));
        assert_eq!(request.data.as_deref(), Some(r#"{"name": "nightly"}"#));
        assert_eq!(request.expect, vec![200, 201]);
        assert_eq!(request.client_request_id.as_deref(), Some("abc"));
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn parse_auth_section() {
        let toml = r#"
            [auth]
            token_file = "/home/me/token.json"
        "#;

        let config = TomlConfig::parse(toml).unwrap();

        assert!(config.auth.bearer.is_none());
        assert_eq!(
            config.auth.token_file.as_deref(),
            Some(std::path::Path::new("/home/me/token.json"))
        );
    }

    #[test]
    fn parse_retry_section() {
        let toml = r"
            [retry]
            max_attempts = 5
            initial_delay = 2
            max_delay = 30
            multiplier = 1.5
        ";

        let config = TomlConfig::parse(toml).unwrap();

        assert_eq!(config.retry.max_attempts, Some(5));
        assert_eq!(config.retry.initial_delay, Some(2));
        assert_eq!(config.retry.max_delay, Some(30));
        assert_eq!(config.retry.multiplier, Some(1.5));
    }

    #[test]
    fn parse_polling_section() {
        let toml = r"
            [polling]
            enabled = true
            delay = 15
            duration = 600
            codes = [201, 202]
        ";

        let config = TomlConfig::parse(toml).unwrap();

        assert!(config.polling.enabled);
        assert_eq!(config.polling.delay, Some(15));
        assert_eq!(config.polling.duration, Some(600));
        assert_eq!(config.polling.codes, vec![201, 202]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let toml = r#"
            [request]
            uri = "https://example.com"
        "#;

        assert!(TomlConfig::parse(toml).is_err());
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(TomlConfig::parse("[server]\nport = \"x\"").is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let toml = r#"
            [retry]
            max_attempts = "three"
        "#;

        assert!(TomlConfig::parse(toml).is_err());
    }
}

mod template {
    use super::*;

    #[test]
    fn template_parses() {
        let template = default_config_template();
        assert!(TomlConfig::parse(&template).is_ok());
    }

    #[test]
    fn template_mentions_every_section() {
        let template = default_config_template();

        for section in ["[request]", "[auth]", "[retry]", "[polling]"] {
            assert!(template.contains(section), "missing {section}");
        }
    }
}
