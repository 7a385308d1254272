use std::sync::Arc;

use tokio::sync::RwLock;
use url::Url;

use crate::error::{GatewayError, GatewayErrorKind};

/// Process-wide enforcement tunables.
///
/// A score above `threshold_block` bans the client; a score above
/// `threshold_throttle` delays it proportionally up to
/// `throttle_max_delay_ms`. Updates are validated: thresholds are clamped
/// into `[0, 1]` and a throttle threshold above the block threshold is
/// rejected outright.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyConfig {
    /// Scores above this value get the client banned. Default 0.8.
    pub threshold_block: f32,
    /// Scores above this value (but at most `threshold_block`) get the
    /// request delayed. Default 0.5.
    pub threshold_throttle: f32,
    /// Delay applied to a request scoring exactly `threshold_block`, in
    /// milliseconds; lower scores scale down linearly. Default 3000.
    pub throttle_max_delay_ms: u64,
    /// How long a ban lasts. Default 300 seconds.
    pub ban_duration_seconds: u64,
    /// Base URL requests are forwarded to.
    pub backend_url: String,
    /// Deadline for each upstream call, in milliseconds. Default 30000.
    pub upstream_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            threshold_block: 0.8,
            threshold_throttle: 0.5,
            throttle_max_delay_ms: 3000,
            ban_duration_seconds: 300,
            backend_url: String::from("http://httpbin.org"),
            upstream_timeout_ms: 30_000,
        }
    }
}

impl PolicyConfig {
    /// Clamps the thresholds into `[0, 1]` and checks their ordering.
    fn validated(mut self) -> Result<Self, GatewayError> {
        self.threshold_block = self.threshold_block.clamp(0.0, 1.0);
        self.threshold_throttle = self.threshold_throttle.clamp(0.0, 1.0);

        if self.threshold_throttle > self.threshold_block {
            return Err(GatewayError::new(
                GatewayErrorKind::InvalidInput,
                format!(
                    "threshold_throttle ({}) must not exceed threshold_block ({})",
                    self.threshold_throttle, self.threshold_block
                ),
            ));
        }

        Ok(self)
    }
}

/// Shared handle to the live [`PolicyConfig`].
///
/// Read by every request, written rarely. Reads always return a copy so no
/// caller ever holds a reference into the guarded storage across an await.
#[derive(Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<PolicyConfig>>,
}

impl PolicyHandle {
    /// Wraps an initial configuration. The initial value is clamped but not
    /// rejected; startup falls back to defaults elsewhere on invalid input.
    pub fn new(config: PolicyConfig) -> Self {
        PolicyHandle {
            inner: Arc::new(RwLock::new(
                config.validated().unwrap_or_else(|_| PolicyConfig::default()),
            )),
        }
    }

    /// A copy of the current configuration.
    pub async fn get(&self) -> PolicyConfig {
        self.inner.read().await.clone()
    }

    /// Replaces the configuration after validation. On rejection the prior
    /// value is retained.
    pub async fn set(&self, config: PolicyConfig) -> Result<(), GatewayError> {
        let config = config.validated()?;
        let mut guard = self.inner.write().await;
        *guard = config;
        Ok(())
    }

    /// Replaces just the backend URL. The URL must parse and use an
    /// `http`/`https` scheme.
    pub async fn set_backend_url(&self, url: &str) -> Result<(), GatewayError> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(GatewayError::new(
                GatewayErrorKind::InvalidInput,
                format!("unsupported backend scheme '{}'", parsed.scheme()),
            ));
        }

        let mut guard = self.inner.write().await;
        guard.backend_url = url.to_string();
        Ok(())
    }

    /// A copy of the current backend URL.
    pub async fn backend_url(&self) -> String {
        self.inner.read().await.backend_url.clone()
    }
}
