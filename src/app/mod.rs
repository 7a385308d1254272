//! # Gateway server
//!
//! Wires the decision pipeline and the management API into an HTTP server:
//! a router whose reserved `/api/` and `/dashboard/` paths go to their
//! controllers and whose catch-all hands everything else to the
//! [`RequestPipeline`](crate::gateway::pipeline::RequestPipeline), plus the
//! TCP accept loop serving HTTP/1.1 and HTTP/2.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use hyper_staticfile::Static;
use routerify_ng::{ext::RequestExt, RouterService};
use tokio::net::TcpListener;
use tracing::error;

use crate::analysis::analyzer::TrafficAnalyzer;
use crate::api::auth::UserStore;
use crate::api::{auth, dashboard, settings};
use crate::app::api_error::ApiError;
use crate::gateway::pipeline::{text_response, RequestPipeline};
use crate::policy::PolicyHandle;

pub(crate) mod api_error;

/// Connection serving logic for HTTP/1.1 and HTTP/2.
pub mod handler;

/// The assembled gateway server.
///
/// Owns the shared components and exposes a builder-flavored surface for
/// the listener settings before [`Gateway::listen`] takes over.
pub struct Gateway {
    /// The host address or interface the server will bind to.
    host: String,

    /// Enables or disables HTTP/2 support. Enabled by default.
    http2: bool,

    /// Whether the accept loop watches for Ctrl+C and drains.
    graceful_shutdown: bool,

    /// Directory served under `/dashboard/`, if any.
    dashboard_dir: Option<String>,

    pipeline: Arc<RequestPipeline>,
    users: Arc<UserStore>,
    policy: PolicyHandle,
    analyzer: Arc<TrafficAnalyzer>,
}

impl Gateway {
    /// Assembles a gateway over already-constructed components.
    pub fn new(
        pipeline: Arc<RequestPipeline>,
        users: Arc<UserStore>,
        policy: PolicyHandle,
        analyzer: Arc<TrafficAnalyzer>,
    ) -> Self {
        Gateway {
            host: String::from("0.0.0.0"),
            http2: true,
            graceful_shutdown: false,
            dashboard_dir: None,
            pipeline,
            users,
            policy,
            analyzer,
        }
    }

    /// Sets the host address for the server to bind to.
    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = host.to_string();
        self
    }

    /// Enables or disables HTTP/2 support. HTTP/1.1 stays available either
    /// way.
    pub fn enable_http2(&mut self, enabled: bool) -> &mut Self {
        self.http2 = enabled;
        self
    }

    /// Serves static dashboard assets from `dir` under `/dashboard/`.
    pub fn dashboard_dir(&mut self, dir: &str) -> &mut Self {
        self.dashboard_dir = Some(dir.to_string());
        self
    }

    /// Enables graceful shutdown: on Ctrl+C the accept loop stops and
    /// in-flight requests finish.
    pub fn with_graceful_shutdown(&mut self) {
        self.graceful_shutdown = true;
    }

    /// Starts the server and runs until shutdown. `cb` fires once the
    /// router is built, right before binding.
    pub async fn listen<F: FnOnce()>(&self, port: u16, cb: F) {
        let router = self.build_router();
        cb();

        let addr = match format!("{}:{}", self.host, port).parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                error!(host = %self.host, port, error = %err, "invalid listen address");
                return;
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(%addr, error = %err, "error binding to address");
                return;
            }
        };

        let router_service = match RouterService::new(router) {
            Ok(service) => Arc::new(service),
            Err(err) => {
                error!(error = ?err, "error building router service");
                return;
            }
        };

        let http2_enabled = self.http2;

        let mut shutdown = if self.graceful_shutdown {
            Some(Box::pin(tokio::signal::ctrl_c()))
        } else {
            None
        };

        loop {
            let accept_result = if let Some(ref mut sig) = shutdown {
                tokio::select! {
                    result = listener.accept() => Some(result),
                    _ = sig.as_mut() => None,
                }
            } else {
                Some(listener.accept().await)
            };

            match accept_result {
                Some(Ok((stream, _))) => {
                    let service = Arc::clone(&router_service);

                    tokio::task::spawn(async move {
                        Self::handle_connection(stream, service, http2_enabled).await;
                    });
                }
                Some(Err(err)) => {
                    error!(error = %err, "error accepting connection");
                }
                None => {
                    // Shutdown signal received
                    break;
                }
            }
        }
    }

    /// Builds the router: management routes first, the dashboard mount, and
    /// the proxy catch-all last so reserved paths win.
    fn build_router(&self) -> routerify_ng::Router<ApiError> {
        let mut builder = routerify_ng::Router::<ApiError>::builder();

        let policy = self.policy.clone();
        builder = builder.post("/api/config/backend", move |req| {
            let policy = policy.clone();
            async move { settings::update_backend(req, policy).await }
        });

        let policy = self.policy.clone();
        builder = builder.get("/api/config/backend", move |_req| {
            let policy = policy.clone();
            async move { settings::get_backend(policy).await }
        });

        let users = Arc::clone(&self.users);
        let analyzer = Arc::clone(&self.analyzer);
        builder = builder.get("/api/stats", move |req| {
            let users = Arc::clone(&users);
            let analyzer = Arc::clone(&analyzer);
            async move { dashboard::get_stats(req, users, analyzer).await }
        });

        let users = Arc::clone(&self.users);
        builder = builder.get("/api/logs", move |req| {
            let users = Arc::clone(&users);
            async move { dashboard::get_logs(req, users).await }
        });

        let users = Arc::clone(&self.users);
        builder = builder.post("/api/auth/signup", move |req| {
            let users = Arc::clone(&users);
            async move { auth::signup(req, users).await }
        });

        let users = Arc::clone(&self.users);
        builder = builder.post("/api/auth/login", move |req| {
            let users = Arc::clone(&users);
            async move { auth::login(req, users).await }
        });

        let users = Arc::clone(&self.users);
        builder = builder.get("/api/auth/profile", move |req| {
            let users = Arc::clone(&users);
            async move { auth::profile(req, users).await }
        });

        if let Some(dir) = &self.dashboard_dir {
            let dir = dir.clone();
            builder = builder.get("/dashboard/*", move |req| {
                let dir = dir.clone();
                async move {
                    match Self::serve_dashboard(req, dir).await {
                        Ok(response) => Ok(response),
                        Err(err) => {
                            error!(error = %err, "error serving dashboard asset");
                            Ok(text_response(
                                StatusCode::INTERNAL_SERVER_ERROR,
                                "Dashboard asset unavailable",
                            ))
                        }
                    }
                }
            });
        }

        // Everything else is proxied. Root is registered explicitly in case
        // the wildcard pattern does not cover it.
        let pipeline = Arc::clone(&self.pipeline);
        builder = builder.add("/", proxied_methods(), move |req| {
            let pipeline = Arc::clone(&pipeline);
            async move { Self::proxy_request(pipeline, req).await }
        });

        let pipeline = Arc::clone(&self.pipeline);
        builder = builder.add("/*", proxied_methods(), move |req| {
            let pipeline = Arc::clone(&pipeline);
            async move { Self::proxy_request(pipeline, req).await }
        });

        builder = builder.err_handler(Self::error_handler);
        builder.build().unwrap()
    }

    /// Hands a request to the pipeline unless it targets a reserved prefix
    /// that fell through the management routes (wrong method, unknown
    /// subpath). Reserved paths are never forwarded upstream.
    async fn proxy_request(
        pipeline: Arc<RequestPipeline>,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Full<Bytes>>, ApiError> {
        let path = req.uri().path();
        if path == "/api"
            || path.starts_with("/api/")
            || path == "/dashboard"
            || path.starts_with("/dashboard/")
        {
            return Ok(text_response(StatusCode::NOT_FOUND, "Not Found"));
        }

        let peer_ip = req.remote_addr().ip();
        Ok(pipeline.handle(req, peer_ip).await)
    }

    /// Converts routing errors into responses.
    pub(crate) async fn error_handler(
        err: routerify_ng::RouteError,
    ) -> Response<Full<hyper::body::Bytes>> {
        let api_err = err.downcast::<ApiError>().unwrap_or_else(|_| {
            Box::new(ApiError::Response(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unhandled error",
            )))
        });

        match *api_err {
            ApiError::Response(response) => response,
        }
    }

    /// Serves one dashboard asset, rewriting the URI so `/dashboard/x.html`
    /// maps to `<dir>/x.html`.
    pub(crate) async fn serve_dashboard(
        req: Request<Full<Bytes>>,
        fs_root: String,
    ) -> Result<Response<Full<Bytes>>, std::io::Error> {
        let (mut parts, body) = req.into_parts();
        let original_uri = parts.uri.clone();
        let original_path = original_uri.path();

        let trimmed_path = original_path
            .strip_prefix("/dashboard")
            .unwrap_or(original_path);
        let normalized_path = if trimmed_path.is_empty() {
            "/"
        } else {
            trimmed_path
        };

        let new_path_and_query = if let Some(query) = original_uri.query() {
            format!("{}?{}", normalized_path, query)
        } else {
            normalized_path.to_string()
        };

        parts.uri = new_path_and_query.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid URI after rewriting: {}", err),
            )
        })?;

        let rewritten_req = Request::from_parts(parts, body);
        let static_service = Static::new(Path::new(fs_root.as_str()));

        let response = static_service.serve(rewritten_req).await?;
        let (mut parts, body) = response.into_parts();
        parts
            .headers
            .insert("Cache-Control", "public, max-age=86400".parse().unwrap());

        let collected = body.collect().await.map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to collect body: {}", err),
            )
        })?;

        Ok(Response::from_parts(parts, Full::from(collected.to_bytes())))
    }
}

fn proxied_methods() -> Vec<Method> {
    vec![
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::PATCH,
    ]
}
