use std::sync::Arc;

use tracing::{info, warn};

use riskgate::analysis::analyzer::TrafficAnalyzer;
use riskgate::api::auth::UserStore;
use riskgate::app::Gateway;
use riskgate::config::{self, AppSettings};
use riskgate::gateway::ban::BanLedger;
use riskgate::gateway::pipeline::RequestPipeline;
use riskgate::policy::PolicyHandle;
use riskgate::scoring::{RiskScorer, RuleBasedScorer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("./config.json"));

    let mut settings = match config::load(&config_path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %config_path, error = %err, "could not load config, using defaults");
            AppSettings::default()
        }
    };
    config::apply_env(&mut settings);

    if let Some(model_path) = &settings.model_path {
        info!(
            model = %model_path,
            "model file configured; learned scoring is not built in, staying rule-based"
        );
    }

    let analyzer = Arc::new(TrafficAnalyzer::new());
    let bans = Arc::new(BanLedger::new());
    let scorer: Arc<dyn RiskScorer> = Arc::new(RuleBasedScorer);
    let policy = PolicyHandle::new(settings.policy.clone());
    let users = Arc::new(UserStore::new());

    let pipeline = Arc::new(RequestPipeline::new(
        Arc::clone(&analyzer),
        bans,
        scorer,
        policy.clone(),
        settings.trust_proxy,
    ));

    let mut gateway = Gateway::new(pipeline, users, policy.clone(), analyzer);
    gateway.host(&settings.host);
    gateway.with_graceful_shutdown();
    if let Some(dir) = &settings.dashboard_dir {
        gateway.dashboard_dir(dir);
    }

    let port = settings.port;
    let backend = policy.backend_url().await;
    gateway
        .listen(port, move || {
            info!(port, backend = %backend, "gateway listening");
        })
        .await;
}
