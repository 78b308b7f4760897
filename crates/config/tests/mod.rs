//! Config file loading tests

mod config_file_tests {
    use firestore_config::{ClientConfig, ConfigError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_full_file() {
        let config = ClientConfig::from_toml_str(
            r#"
            project_id = "my-project"
            database_id = "orders"
            emulator_host = "localhost:8080"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.project_id, "my-project");
        assert_eq!(config.database_id, "orders");
        assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.database_name().unwrap().path(),
            "projects/my-project/databases/orders"
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = ClientConfig::from_toml_str(r#"project_id = "p""#).unwrap();
        assert_eq!(config.database_id, "(default)");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_error() {
        let err = ClientConfig::from_toml_str("project_id = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_database_id() {
        let config = ClientConfig::new("p").with_database_id("a/b");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            project_id = "loaded-project"
            "#,
        );
        // Environment may carry FIRESTORE_PROJECT_ID on a developer machine.
        if std::env::var(firestore_config::ENV_PROJECT_ID).is_ok() {
            return;
        }
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.project_id, "loaded-project");
    }
}
