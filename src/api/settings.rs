use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::json_response;
use crate::app::api_error::ApiError;
use crate::policy::PolicyHandle;

#[derive(Deserialize)]
struct BackendUpdate {
    url: Option<String>,
}

/// `POST /api/config/backend` — repoints the proxy at a new backend.
///
/// Malformed JSON and missing/empty/unparseable URLs are rejected with 400
/// and leave the current backend untouched.
pub async fn update_backend(
    req: Request<Full<Bytes>>,
    policy: PolicyHandle,
) -> Result<Response<Full<Bytes>>, ApiError> {
    // Full<Bytes> collection is infallible
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let update: BackendUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(_) => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid JSON"}),
            ));
        }
    };

    let url = match update.url.filter(|url| !url.is_empty()) {
        Some(url) => url,
        None => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": "URL required"}),
            ));
        }
    };

    if let Err(err) = policy.set_backend_url(&url).await {
        return Ok(json_response(
            StatusCode::BAD_REQUEST,
            json!({"error": err.message()}),
        ));
    }

    info!(url = %url, "backend URL updated");
    Ok(json_response(
        StatusCode::OK,
        json!({"status": "updated", "url": url}),
    ))
}

/// `GET /api/config/backend` — the backend currently in use.
pub async fn get_backend(policy: PolicyHandle) -> Result<Response<Full<Bytes>>, ApiError> {
    let url = policy.backend_url().await;
    Ok(json_response(StatusCode::OK, json!({"url": url})))
}
