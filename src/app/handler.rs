use std::sync::Arc;

use crate::app::{api_error::ApiError, Gateway};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{server::conn::http1, service::Service};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use routerify_ng::RouterService;
use tracing::error;

impl Gateway {
    pub(crate) async fn handle_connection(
        stream: tokio::net::TcpStream,
        service: Arc<RouterService<ApiError>>,
        http2_enabled: bool,
    ) {
        let request_service = match service.call(&stream).await {
            Ok(svc) => svc,
            Err(err) => {
                error!(error = ?err, "error creating per-connection service");
                return;
            }
        };

        let io = TokioIo::new(stream);

        if http2_enabled {
            Self::serve_http1_and_http2(io, request_service).await;
        } else {
            Self::serve_http1_only(io, request_service).await;
        }
    }

    async fn serve_http1_and_http2<I, S>(io: I, service: S)
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin + 'static + Send,
        S: hyper::service::Service<
                hyper::Request<hyper::body::Incoming>,
                Response = hyper::Response<Full<Bytes>>,
            > + Send
            + 'static,
        S::Future: Send + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut builder = Builder::new(TokioExecutor::new());
        builder.http1().keep_alive(true);

        if let Err(err) = builder.serve_connection_with_upgrades(io, service).await {
            error!(error = ?err, "error serving connection");
        }
    }

    async fn serve_http1_only<I, S>(io: I, service: S)
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin + 'static + Send,
        S: hyper::service::Service<
                hyper::Request<hyper::body::Incoming>,
                Response = hyper::Response<Full<Bytes>>,
            > + Send
            + 'static,
        S::Future: Send + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut builder = http1::Builder::new();
        builder.keep_alive(true);

        if let Err(err) = builder.serve_connection(io, service).with_upgrades().await {
            error!(error = ?err, "error serving connection");
        }
    }
}
