use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::convert::Infallible;

use crate::gateway::pipeline::text_response;

/// Error type carried through the router.
///
/// Handlers fold every failure into a ready-to-send response; the router's
/// error handler just unwraps it. Nothing in the request path escapes as a
/// bare error.
#[derive(Debug)]
pub enum ApiError {
    /// The response to send for this failure.
    Response(Response<Full<Bytes>>),
}

impl From<Response<Full<Bytes>>> for ApiError {
    fn from(response: Response<Full<Bytes>>) -> Self {
        ApiError::Response(response)
    }
}

impl From<Infallible> for ApiError {
    fn from(_: Infallible) -> Self {
        ApiError::Response(text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unhandled error",
        ))
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ApiError::Response(response) => {
                write!(f, "request failed with status {}", response.status())
            }
        }
    }
}
