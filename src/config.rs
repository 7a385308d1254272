use serde::Deserialize;

use crate::error::GatewayError;
use crate::policy::PolicyConfig;

/// On-disk configuration file shape. Every key is optional; unknown keys
/// are ignored so the file can carry settings for other tooling.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: Option<ServerSection>,
    /// Scoring and enforcement settings. The section name is historical:
    /// it also carries the (ignored) model path.
    #[serde(default)]
    pub ml_model: Option<MlModelSection>,
}

/// The `server` section of the config file.
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Interface to bind. Default `0.0.0.0`.
    pub host: Option<String>,
    /// Port to bind. Default 8080.
    pub port: Option<u16>,
    /// Trust `X-Forwarded-For` when fingerprinting. Default false.
    pub trust_proxy: Option<bool>,
    /// Directory served under `/dashboard/`. Default none.
    pub dashboard_dir: Option<String>,
}

/// The `ml_model` section of the config file.
#[derive(Debug, Deserialize)]
pub struct MlModelSection {
    /// Model file path. Accepted and logged, but learned scoring is not
    /// built in; the process stays on the rule-based scorer.
    pub path: Option<String>,
    /// See [`PolicyConfig::threshold_block`].
    pub threshold_block: Option<f32>,
    /// See [`PolicyConfig::threshold_throttle`].
    pub threshold_throttle: Option<f32>,
    /// See [`PolicyConfig::throttle_max_delay_ms`].
    pub throttle_max_delay_ms: Option<u64>,
    /// See [`PolicyConfig::ban_duration_seconds`].
    pub ban_duration_seconds: Option<u64>,
}

/// Fully resolved startup settings: the config file merged over defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Trust `X-Forwarded-For` when fingerprinting.
    pub trust_proxy: bool,
    /// Directory served under `/dashboard/`, if any.
    pub dashboard_dir: Option<String>,
    /// Configured model file, if any. Informational only.
    pub model_path: Option<String>,
    /// Initial enforcement policy.
    pub policy: PolicyConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            host: String::from("0.0.0.0"),
            port: 8080,
            trust_proxy: false,
            dashboard_dir: None,
            model_path: None,
            policy: PolicyConfig::default(),
        }
    }
}

/// Reads and resolves the config file at `path`.
pub fn load(path: &str) -> Result<AppSettings, GatewayError> {
    let raw = std::fs::read_to_string(path)?;
    let file: FileConfig = serde_json::from_str(&raw)?;
    Ok(resolve(file))
}

/// Merges a parsed config file over the defaults.
pub fn resolve(file: FileConfig) -> AppSettings {
    let mut settings = AppSettings::default();

    if let Some(server) = file.server {
        if let Some(host) = server.host {
            settings.host = host;
        }
        if let Some(port) = server.port {
            settings.port = port;
        }
        if let Some(trust_proxy) = server.trust_proxy {
            settings.trust_proxy = trust_proxy;
        }
        settings.dashboard_dir = server.dashboard_dir;
    }

    if let Some(model) = file.ml_model {
        settings.model_path = model.path;
        if let Some(threshold_block) = model.threshold_block {
            settings.policy.threshold_block = threshold_block;
        }
        if let Some(threshold_throttle) = model.threshold_throttle {
            settings.policy.threshold_throttle = threshold_throttle;
        }
        if let Some(delay) = model.throttle_max_delay_ms {
            settings.policy.throttle_max_delay_ms = delay;
        }
        if let Some(duration) = model.ban_duration_seconds {
            settings.policy.ban_duration_seconds = duration;
        }
    }

    settings
}

/// Applies environment overrides. `BACKEND_URL`, when set and non-empty,
/// replaces the configured backend.
pub fn apply_env(settings: &mut AppSettings) {
    if let Ok(url) = std::env::var("BACKEND_URL") {
        if !url.is_empty() {
            settings.policy.backend_url = url;
        }
    }
}
