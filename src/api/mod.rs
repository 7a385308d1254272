//! # Management API
//!
//! The JSON surface under `/api/`: backend configuration, the dashboard's
//! stats and logs endpoints, and the user/session store backing their
//! bearer-token checks. These paths are reserved and never proxied.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};

/// User accounts and bearer-token sessions.
pub mod auth;

/// Authenticated stats and logs endpoints.
pub mod dashboard;

/// Backend URL configuration endpoints.
pub mod settings;

/// JSON response with the given status.
pub(crate) fn json_response(status: StatusCode, value: serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::from(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
