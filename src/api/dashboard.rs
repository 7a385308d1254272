use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use crate::analysis::analyzer::TrafficAnalyzer;
use crate::api::auth::{authorized_user, unauthorized, UserStore};
use crate::api::json_response;
use crate::app::api_error::ApiError;

/// Clients scoring above this show up in the `high_risk_clients` tally.
const HIGH_RISK_THRESHOLD: f32 = 0.7;

/// `GET /api/stats` — per-client metrics plus global aggregates.
///
/// The snapshot walks every client record, so this path is deliberately
/// slow compared to the proxy hot path; it never blocks traffic beyond the
/// per-record locks it briefly takes.
pub async fn get_stats(
    req: Request<Full<Bytes>>,
    users: Arc<UserStore>,
    analyzer: Arc<TrafficAnalyzer>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    if authorized_user(&req, &users).await.is_none() {
        return Ok(unauthorized());
    }

    let snapshot = analyzer.snapshot_all().await;

    let mut clients = Vec::with_capacity(snapshot.len());
    let mut total_rps = 0.0f64;
    let mut total_requests = 0usize;
    let mut total_risk = 0.0f32;
    let mut high_risk_clients = 0usize;

    for (fingerprint, metrics) in &snapshot {
        clients.push(json!({
            "client_id": fingerprint.to_string(),
            "rps": metrics.rps,
            "burstiness": metrics.burstiness,
            "total": metrics.total_requests,
            "risk_score": metrics.risk_score,
            "endpoint_entropy": metrics.endpoint_entropy,
            "error_rate": metrics.error_rate,
            "errors_4xx": metrics.error_count_4xx,
            "errors_5xx": metrics.error_count_5xx,
        }));

        total_rps += metrics.rps;
        total_requests += metrics.total_requests;
        total_risk += metrics.risk_score;
        if metrics.risk_score > HIGH_RISK_THRESHOLD {
            high_risk_clients += 1;
        }
    }

    let avg_risk_score = if snapshot.is_empty() {
        0.0
    } else {
        total_risk / snapshot.len() as f32
    };

    Ok(json_response(
        StatusCode::OK,
        json!({
            "clients": clients,
            "global": {
                "active_clients": snapshot.len(),
                "total_rps": total_rps,
                "total_requests_tracked": total_requests,
                "avg_risk_score": avg_risk_score,
                "high_risk_clients": high_risk_clients,
            },
        }),
    ))
}

/// `GET /api/logs` — placeholder until a log ring sink is wired in.
pub async fn get_logs(
    req: Request<Full<Bytes>>,
    users: Arc<UserStore>,
) -> Result<Response<Full<Bytes>>, ApiError> {
    if authorized_user(&req, &users).await.is_none() {
        return Ok(unauthorized());
    }

    Ok(json_response(
        StatusCode::OK,
        json!({"logs": "Not implemented in this version (requires a log sink binding)"}),
    ))
}
