#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;

    use crate::analysis::analyzer::TrafficAnalyzer;
    use crate::fingerprint::ClientFingerprint;
    use crate::gateway::ban::BanLedger;
    use crate::gateway::pipeline::{
        decide, RequestPipeline, Verdict, BODY_BAD_GATEWAY, BODY_BANNED, BODY_BLOCKED,
    };
    use crate::policy::{PolicyConfig, PolicyHandle};
    use crate::scoring::RiskScorer;

    const PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    struct FixedScorer(f32);

    impl RiskScorer for FixedScorer {
        fn score(&self, _features: &[f32]) -> f32 {
            self.0
        }
    }

    struct TestBackend {
        addr: SocketAddr,
        hits: Arc<AtomicUsize>,
    }

    /// Serves an echo backend on a random loopback port: request bodies
    /// come back verbatim, `/error` answers 500, `/missing` answers 404,
    /// and every response carries `x-upstream` plus a `content-encoding`
    /// header the proxy is expected to strip.
    async fn spawn_backend() -> TestBackend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let accept_hits = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let hits = Arc::clone(&accept_hits);

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let hits = Arc::clone(&hits);
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            let path = req.uri().path().to_string();
                            let body = req.into_body().collect().await.unwrap().to_bytes();

                            let mut response = Response::new(Full::new(body));
                            response
                                .headers_mut()
                                .insert("x-upstream", "yes".parse().unwrap());
                            response
                                .headers_mut()
                                .insert("content-encoding", "identity".parse().unwrap());
                            if path == "/error" {
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            } else if path == "/missing" {
                                *response.status_mut() = StatusCode::NOT_FOUND;
                            }

                            Ok::<_, std::convert::Infallible>(response)
                        }
                    });

                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        TestBackend { addr, hits }
    }

    fn components(
        score: f32,
        backend_url: String,
    ) -> (Arc<RequestPipeline>, Arc<TrafficAnalyzer>, Arc<BanLedger>) {
        components_with(score, PolicyConfig {
            backend_url,
            ..PolicyConfig::default()
        })
    }

    fn components_with(
        score: f32,
        config: PolicyConfig,
    ) -> (Arc<RequestPipeline>, Arc<TrafficAnalyzer>, Arc<BanLedger>) {
        let analyzer = Arc::new(TrafficAnalyzer::new());
        let bans = Arc::new(BanLedger::new());
        let pipeline = Arc::new(RequestPipeline::new(
            Arc::clone(&analyzer),
            Arc::clone(&bans),
            Arc::new(FixedScorer(score)),
            PolicyHandle::new(config),
            false,
        ));
        (pipeline, analyzer, bans)
    }

    fn request(path: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn anonymous_peer_fingerprint() -> ClientFingerprint {
        ClientFingerprint::derive("127.0.0.1", "", "")
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn verdicts_follow_the_thresholds() {
        let config = PolicyConfig::default();

        assert_eq!(decide(0.0, &config), Verdict::Allow);
        assert_eq!(decide(0.45, &config), Verdict::Allow);
        assert_eq!(decide(0.5, &config), Verdict::Allow);
        assert_eq!(
            decide(0.65, &config),
            Verdict::Throttle(Duration::from_millis(1500))
        );
        assert_eq!(
            decide(0.8, &config),
            Verdict::Throttle(Duration::from_millis(3000))
        );
        assert_eq!(decide(0.81, &config), Verdict::Block);
        assert_eq!(decide(1.0, &config), Verdict::Block);
    }

    #[tokio::test]
    async fn low_risk_requests_are_forwarded_verbatim() {
        let backend = spawn_backend().await;
        let (pipeline, _, _) = components(0.0, format!("http://{}", backend.addr));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo?q=1")
            .header("x-probe", "1")
            .body(Full::new(Bytes::from_static(b"hello")))
            .unwrap();
        let response = pipeline.handle(req, PEER).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
        // framing headers from the upstream are regenerated, not relayed
        assert!(response.headers().get("content-encoding").is_none());
        assert_eq!(body_string(response).await, "hello");
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn high_risk_request_is_banned_then_rejected() {
        let backend = spawn_backend().await;
        let (pipeline, analyzer, bans) = components(0.95, format!("http://{}", backend.addr));

        let first = pipeline.handle(request("/a"), PEER).await;
        assert_eq!(first.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(first).await, BODY_BLOCKED);
        assert!(bans.is_banned(anonymous_peer_fingerprint()).await);

        // the freshly computed score was written back before enforcement
        let snapshot = analyzer.snapshot_all().await;
        assert_eq!(snapshot[0].1.risk_score, 0.95);

        let second = pipeline.handle(request("/a"), PEER).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_string(second).await, BODY_BANNED);

        // neither the banning request nor the banned one reached upstream
        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn banned_requests_are_not_metered() {
        let backend = spawn_backend().await;
        let (pipeline, analyzer, _) = components(0.95, format!("http://{}", backend.addr));

        pipeline.handle(request("/a"), PEER).await;
        pipeline.handle(request("/a"), PEER).await;
        pipeline.handle(request("/a"), PEER).await;

        let snapshot = analyzer.snapshot_all().await;
        assert_eq!(snapshot[0].1.total_requests, 1);
    }

    #[tokio::test]
    async fn upstream_errors_are_accounted_to_the_client() {
        let backend = spawn_backend().await;
        let (pipeline, analyzer, _) = components(0.0, format!("http://{}", backend.addr));

        let server_error = pipeline.handle(request("/error"), PEER).await;
        assert_eq!(server_error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let client_error = pipeline.handle(request("/missing"), PEER).await;
        assert_eq!(client_error.status(), StatusCode::NOT_FOUND);

        let snapshot = analyzer.snapshot_all().await;
        let (_, metrics) = &snapshot[0];
        assert_eq!(metrics.error_count_5xx, 1);
        assert_eq!(metrics.error_count_4xx, 1);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_502_without_error_stats() {
        // grab a loopback port and release it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (pipeline, analyzer, _) = components(0.0, format!("http://{}", addr));

        let response = pipeline.handle(request("/a"), PEER).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_string(response).await, BODY_BAD_GATEWAY);

        // the client did not cause this; its error counters stay at zero
        let snapshot = analyzer.snapshot_all().await;
        let (_, metrics) = &snapshot[0];
        assert_eq!(metrics.error_count_4xx, 0);
        assert_eq!(metrics.error_count_5xx, 0);
    }

    #[tokio::test]
    async fn throttled_requests_wait_before_forwarding() {
        let backend = spawn_backend().await;
        let (pipeline, _, _) = components_with(
            0.65,
            PolicyConfig {
                backend_url: format!("http://{}", backend.addr),
                throttle_max_delay_ms: 200,
                ..PolicyConfig::default()
            },
        );

        // (0.65 - 0.5) / (0.8 - 0.5) of 200ms is a 100ms delay
        let start = Instant::now();
        let response = pipeline.handle(request("/slow"), PEER).await;
        let elapsed = start.elapsed();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forwarded_clients_accumulate_window_counts() {
        let backend = spawn_backend().await;
        let (pipeline, analyzer, _) = components(0.0, format!("http://{}", backend.addr));

        for _ in 0..5 {
            let response = pipeline.handle(request("/steady"), PEER).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let snapshot = analyzer.snapshot_all().await;
        let (_, metrics) = &snapshot[0];
        assert_eq!(metrics.total_requests, 5);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 5);
    }
}
