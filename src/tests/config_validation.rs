// Shipped config, env placeholder expansion, defaults and aggregated
// validation errors.

#[cfg(test)]
mod test {

    use std::path::{Path, PathBuf};

    use serial_test::serial;

    use crate::config::proc_loader::{expand_env_vars, file_to_config, parse_config};
    use crate::config::proc_validator::validate_service_config;
    use crate::config::settings::LogFormat;
    use crate::utils::constants::DEFAULT_EXCLUDED_CLASSES;

    #[tokio::test]
    #[serial]
    async fn shipped_config_is_valid_with_env() {
        std::env::set_var("school", "springfield");
        std::env::set_var("client_id", "cid");
        std::env::set_var("secret", "shh");
        std::env::set_var("STUDENT_DB_PATH", "/tmp/interim-report/student_list.json");

        let path = Path::new("interim-report.yaml");
        let service_config = file_to_config(path)
            .await
            .expect("interim-report.yaml must exist in repo root for tests");
        validate_service_config(&service_config).unwrap();

        assert_eq!(service_config.api.school, "springfield");
        assert_eq!(service_config.api.client_secret, "shh");
        assert_eq!(
            service_config.index.path,
            PathBuf::from("/tmp/interim-report/student_list.json")
        );
        assert_eq!(service_config.index.offsets, vec![0, 100, 200]);
        assert_eq!(
            service_config.api.endpoints().token_url,
            "https://accounts.veracross.com/springfield/oauth/token"
        );

        for var in ["school", "client_id", "secret", "STUDENT_DB_PATH"] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn env_placeholders_fall_back_to_defaults() {
        std::env::remove_var("INTERIM_TEST_UNSET");
        std::env::set_var("INTERIM_TEST_SET", "value");
        assert_eq!(
            expand_env_vars("a: ${INTERIM_TEST_UNSET:fallback}\nb: ${INTERIM_TEST_SET:x}\nc: ${INTERIM_TEST_UNSET}"),
            "a: fallback\nb: value\nc: "
        );
        std::env::remove_var("INTERIM_TEST_SET");
    }

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let yaml = r#"
api:
  school: s
  client_id: id
  client_secret: secret
index:
  path: students.json
"#;
        let cfg = parse_config(yaml.to_string()).await.unwrap();
        assert_eq!(cfg.api.page_size, 500);
        assert_eq!(cfg.api.rate_limit_low_water, 2);
        assert!(cfg.api.reuse_token);
        assert!(cfg.pipeline.fetch_class_list);
        assert_eq!(cfg.pipeline.excluded_classes, DEFAULT_EXCLUDED_CLASSES.to_vec());
        assert_eq!(cfg.settings.server.port, "8080");
        assert!(!cfg.settings.metrics.is_enabled);
        assert!(cfg.settings.logging.is_none());
    }

    #[tokio::test]
    async fn invalid_config_reports_all_errors() {
        let invalid_yaml = r#"
settings:
  retry:
    attempts: 0
    base_delay_ms: 500
    max_delay_ms: 100
  server:
    port: "eighty"
  logging:
    level: loud
    format: json
api:
  school: ""
  client_id: id
  client_secret: ""
  scopes: []
  page_size: 0
index:
  path: students.json
  offsets: []
"#;
        let err = parse_config(invalid_yaml.to_string()).await.unwrap_err().to_string();
        assert!(err.starts_with("config is not valid"), "{err}");
        for expected in [
            "settings.retry.attempts",
            "settings.retry.max_delay_ms",
            "settings.server.port",
            "settings.logging.level",
            "api.school",
            "api.client_secret",
            "api.scopes",
            "api.page_size",
            "index.offsets",
        ] {
            assert!(err.contains(expected), "missing '{expected}' in: {err}");
        }
        assert!(!err.contains("api.client_id"));
    }

    #[tokio::test]
    async fn malformed_yaml_is_rejected() {
        let err = parse_config("api: [unclosed".to_string()).await.unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    #[serial]
    fn log_format_reads_env() {
        std::env::set_var("LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        std::env::remove_var("LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
    }
}
