use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderName};
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{info, warn};

use crate::analysis::analyzer::TrafficAnalyzer;
use crate::fingerprint::ClientFingerprint;
use crate::gateway::ban::BanLedger;
use crate::policy::{PolicyConfig, PolicyHandle};
use crate::scoring::RiskScorer;

/// Body returned to clients that hit an existing ban ledger entry.
pub(crate) const BODY_BANNED: &str = "Too Many Requests: Temporarily Banned";
/// Body returned to the request whose score triggered the ban.
pub(crate) const BODY_BLOCKED: &str = "Access Denied: High Risk Detected - Temporarily Banned";
/// Body returned when the upstream cannot be reached.
pub(crate) const BODY_BAD_GATEWAY: &str = "Bad Gateway";

/// Outcome of applying the policy thresholds to a risk score.
#[derive(Debug, PartialEq)]
pub(crate) enum Verdict {
    /// Forward immediately.
    Allow,
    /// Forward after the given delay.
    Throttle(Duration),
    /// Ban the client and reject the request.
    Block,
}

/// Maps a score onto the policy thresholds.
///
/// The throttle delay scales linearly from zero at `threshold_throttle` up
/// to `throttle_max_delay_ms` at `threshold_block`. The throttle arm is
/// unreachable when the thresholds coincide, so the division is safe.
pub(crate) fn decide(score: f32, config: &PolicyConfig) -> Verdict {
    if score > config.threshold_block {
        Verdict::Block
    } else if score > config.threshold_throttle {
        let span = config.threshold_block - config.threshold_throttle;
        let fraction = ((score - config.threshold_throttle) / span) as f64;
        let delay_ms = (fraction * config.throttle_max_delay_ms as f64) as u64;
        Verdict::Throttle(Duration::from_millis(delay_ms))
    } else {
        Verdict::Allow
    }
}

/// Per-request decision pipeline.
///
/// Each request walks the same path: derive the fingerprint, consult the
/// ban ledger, meter the request through the analyzer, score the resulting
/// feature vector, then enforce policy — ban-and-403, delay-then-forward,
/// or forward immediately. Upstream 4xx/5xx responses are accounted back
/// into the client's statistics after the fact.
///
/// No analyzer, ledger, or policy lock is ever held across the upstream
/// call or a throttle delay. If the incoming request is cancelled mid-call
/// the upstream future is dropped with it; statistics already recorded are
/// not rolled back since the request did arrive.
pub struct RequestPipeline {
    analyzer: Arc<TrafficAnalyzer>,
    bans: Arc<BanLedger>,
    scorer: Arc<dyn RiskScorer>,
    policy: PolicyHandle,
    trust_proxy: bool,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl RequestPipeline {
    /// Builds a pipeline over shared components. `trust_proxy` switches the
    /// fingerprint's address component to the first `X-Forwarded-For` entry
    /// when one is present.
    pub fn new(
        analyzer: Arc<TrafficAnalyzer>,
        bans: Arc<BanLedger>,
        scorer: Arc<dyn RiskScorer>,
        policy: PolicyHandle,
        trust_proxy: bool,
    ) -> Self {
        RequestPipeline {
            analyzer,
            bans,
            scorer,
            policy,
            trust_proxy,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    /// Runs one request through the full pipeline and produces the response
    /// to send back, whatever happened. `peer_ip` is the connection's
    /// remote address as seen by the listener.
    pub async fn handle(&self, req: Request<Full<Bytes>>, peer_ip: IpAddr) -> Response<Full<Bytes>> {
        let fingerprint = self.fingerprint(&req, peer_ip);

        if self.bans.is_banned(fingerprint).await {
            info!(client = %fingerprint, "rejecting banned client");
            return text_response(StatusCode::TOO_MANY_REQUESTS, BODY_BANNED);
        }

        let (parts, body) = req.into_parts();
        // Full<Bytes> collection is infallible
        let body = body.collect().await.unwrap().to_bytes();

        let endpoint = parts.uri.path().to_string();
        let metrics = self
            .analyzer
            .update_and_get_metrics(fingerprint, &endpoint, body.len())
            .await;

        let features = [
            metrics.rps as f32,
            metrics.burstiness as f32,
            metrics.endpoint_entropy as f32,
            metrics.error_rate,
        ];
        let score = self.scorer.score(&features);
        self.analyzer.update_risk_score(fingerprint, score).await;

        let config = self.policy.get().await;
        info!(
            client = %fingerprint,
            path = %endpoint,
            rps = metrics.rps,
            entropy = metrics.endpoint_entropy,
            risk = score,
            "scored request"
        );

        match decide(score, &config) {
            Verdict::Block => {
                self.bans
                    .ban(
                        fingerprint,
                        Duration::from_secs(config.ban_duration_seconds),
                        score,
                    )
                    .await;
                warn!(client = %fingerprint, risk = score, "banning high-risk client");
                text_response(StatusCode::FORBIDDEN, BODY_BLOCKED)
            }
            Verdict::Throttle(delay) => {
                warn!(
                    client = %fingerprint,
                    delay_ms = delay.as_millis() as u64,
                    risk = score,
                    "throttling client"
                );
                tokio::time::sleep(delay).await;
                self.forward(fingerprint, parts, body, &config).await
            }
            Verdict::Allow => self.forward(fingerprint, parts, body, &config).await,
        }
    }

    /// Relays the request to the backend and mirrors its response.
    ///
    /// Method, path, body, and request headers are copied verbatim; the
    /// response comes back with status and body intact and the framing
    /// headers stripped so the local HTTP stack can regenerate them. Any
    /// transport failure — refused connection, timeout, broken body —
    /// becomes a 502 without touching the client's error statistics.
    async fn forward(
        &self,
        fingerprint: ClientFingerprint,
        parts: hyper::http::request::Parts,
        body: Bytes,
        config: &PolicyConfig,
    ) -> Response<Full<Bytes>> {
        let uri = match upstream_uri(&config.backend_url, &parts.uri) {
            Ok(uri) => uri,
            Err(err) => {
                warn!(backend = %config.backend_url, error = %err, "invalid upstream URI");
                return text_response(StatusCode::BAD_GATEWAY, BODY_BAD_GATEWAY);
            }
        };

        let mut upstream_req = Request::new(Full::from(body));
        *upstream_req.method_mut() = parts.method.clone();
        *upstream_req.uri_mut() = uri;
        *upstream_req.headers_mut() = parts.headers.clone();

        let deadline = Duration::from_millis(config.upstream_timeout_ms);
        let response = match tokio::time::timeout(deadline, self.client.request(upstream_req)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(client = %fingerprint, error = %err, "upstream request failed");
                return text_response(StatusCode::BAD_GATEWAY, BODY_BAD_GATEWAY);
            }
            Err(_) => {
                warn!(
                    client = %fingerprint,
                    timeout_ms = config.upstream_timeout_ms,
                    "upstream request timed out"
                );
                return text_response(StatusCode::BAD_GATEWAY, BODY_BAD_GATEWAY);
            }
        };

        let status = response.status();
        if status.is_client_error() {
            self.analyzer.record_error(fingerprint, true, false).await;
        } else if status.is_server_error() {
            self.analyzer.record_error(fingerprint, false, true).await;
        }

        let (upstream_parts, upstream_body) = response.into_parts();
        let body = match upstream_body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!(client = %fingerprint, error = %err, "upstream body read failed");
                return text_response(StatusCode::BAD_GATEWAY, BODY_BAD_GATEWAY);
            }
        };

        let mut downstream = Response::new(Full::from(body));
        *downstream.status_mut() = status;
        for (name, value) in upstream_parts.headers.iter() {
            if !is_framing_header(name) {
                downstream.headers_mut().append(name.clone(), value.clone());
            }
        }
        downstream
    }

    /// Derives the client identity for this request.
    fn fingerprint(&self, req: &Request<Full<Bytes>>, peer_ip: IpAddr) -> ClientFingerprint {
        let ip = if self.trust_proxy {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(|forwarded| forwarded.trim().to_string())
                .unwrap_or_else(|| peer_ip.to_string())
        } else {
            peer_ip.to_string()
        };

        let authorization = header_str(req, &header::AUTHORIZATION);
        let user_agent = header_str(req, &header::USER_AGENT);
        ClientFingerprint::derive(&ip, authorization, user_agent)
    }
}

/// Joins the configured backend base with the original path and query.
fn upstream_uri(backend_url: &str, original: &Uri) -> Result<Uri, hyper::http::uri::InvalidUri> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}{}", backend_url.trim_end_matches('/'), path_and_query).parse()
}

/// Headers the local HTTP stack regenerates rather than relays.
fn is_framing_header(name: &HeaderName) -> bool {
    *name == header::CONTENT_LENGTH
        || *name == header::TRANSFER_ENCODING
        || *name == header::CONTENT_ENCODING
        || *name == header::CONNECTION
}

/// Plain-text response with the given status.
pub(crate) fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

fn header_str<'a>(req: &'a Request<Full<Bytes>>, name: &HeaderName) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
