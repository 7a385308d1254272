#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::config::{self, AppSettings};
    use crate::error::GatewayErrorKind;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = config::load("/nonexistent/riskgate-config.json").unwrap_err();
        assert_eq!(*err.kind(), GatewayErrorKind::IO);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let file = write_config("{ this is not json");
        let err = config::load(file.path().to_str().unwrap()).unwrap_err();
        assert_eq!(*err.kind(), GatewayErrorKind::ParseError);
    }

    #[test]
    fn empty_object_yields_defaults() {
        let file = write_config("{}");
        let settings = config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn full_file_overrides_defaults() {
        let file = write_config(
            r#"{
                "server": {
                    "host": "127.0.0.1",
                    "port": 9090,
                    "trust_proxy": true,
                    "dashboard_dir": "./assets"
                },
                "ml_model": {
                    "path": "./model.onnx",
                    "threshold_block": 0.9,
                    "threshold_throttle": 0.4,
                    "throttle_max_delay_ms": 1000,
                    "ban_duration_seconds": 120
                }
            }"#,
        );

        let settings = config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 9090);
        assert!(settings.trust_proxy);
        assert_eq!(settings.dashboard_dir.as_deref(), Some("./assets"));
        assert_eq!(settings.model_path.as_deref(), Some("./model.onnx"));
        assert_eq!(settings.policy.threshold_block, 0.9);
        assert_eq!(settings.policy.threshold_throttle, 0.4);
        assert_eq!(settings.policy.throttle_max_delay_ms, 1000);
        assert_eq!(settings.policy.ban_duration_seconds, 120);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file = write_config(r#"{"listeners": [{"port": 80}], "ml_model": {"threshold_block": 0.75}}"#);
        let settings = config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.policy.threshold_block, 0.75);
    }

    #[test]
    fn backend_env_override_applies() {
        let mut settings = AppSettings::default();
        unsafe { std::env::set_var("BACKEND_URL", "http://override.internal:9000") };
        config::apply_env(&mut settings);
        unsafe { std::env::remove_var("BACKEND_URL") };

        assert_eq!(settings.policy.backend_url, "http://override.internal:9000");
    }
}
