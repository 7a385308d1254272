use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::analysis::window::SlidingWindow;
use crate::fingerprint::ClientFingerprint;

/// Default trailing-time span tracked per client.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Number of payload sizes retained per client; older entries are dropped.
const PAYLOAD_RING_CAPACITY: usize = 1000;

/// Point-in-time view of one client's traffic, as returned by the analyzer.
///
/// `risk_score` carries the score recorded for the *previous* request: the
/// pipeline writes the fresh score back through
/// [`TrafficAnalyzer::update_risk_score`] after scoring, so an observer of a
/// request's metrics always sees what the client looked like before it.
#[derive(Clone, Debug, Default)]
pub struct TrafficMetrics {
    /// Requests per second averaged over the window.
    pub rps: f64,
    /// Population variance of inter-arrival intervals, ms².
    pub burstiness: f64,
    /// Number of requests currently inside the window.
    pub total_requests: usize,
    /// Shannon entropy over the endpoint histogram, in bits.
    pub endpoint_entropy: f64,
    /// Errors divided by every request ever tracked, in [0, 1].
    pub error_rate: f32,
    /// The previously recorded risk score.
    pub risk_score: f32,
    /// Lifetime count of upstream 4xx responses.
    pub error_count_4xx: u64,
    /// Lifetime count of upstream 5xx responses.
    pub error_count_5xx: u64,
    /// Integer mean of the retained payload sizes, in bytes.
    pub avg_payload_size: u64,
}

/// Everything tracked for one client fingerprint.
///
/// Lives behind a per-record mutex; the registry hands out `Arc`s so
/// in-flight requests can keep a reference without pinning the registry
/// lock. Records are never destroyed during the process lifetime.
struct ClientStats {
    window: SlidingWindow,
    endpoint_counts: AHashMap<String, u64>,
    payload_sizes: VecDeque<usize>,
    error_count_4xx: u64,
    error_count_5xx: u64,
    total_requests_tracked: u64,
    last_risk_score: f32,
}

impl ClientStats {
    fn new(window: Duration) -> Self {
        ClientStats {
            window: SlidingWindow::new(window),
            endpoint_counts: AHashMap::new(),
            payload_sizes: VecDeque::new(),
            error_count_4xx: 0,
            error_count_5xx: 0,
            total_requests_tracked: 0,
            last_risk_score: 0.0,
        }
    }

    /// Snapshot of the derived quantities. Caller holds the record lock.
    fn metrics(&mut self) -> TrafficMetrics {
        let total_errors = self.error_count_4xx + self.error_count_5xx;
        let error_rate = if self.total_requests_tracked > 0 {
            total_errors as f32 / self.total_requests_tracked as f32
        } else {
            0.0
        };

        let avg_payload_size = if self.payload_sizes.is_empty() {
            0
        } else {
            self.payload_sizes.iter().map(|size| *size as u64).sum::<u64>()
                / self.payload_sizes.len() as u64
        };

        TrafficMetrics {
            rps: self.window.rate(),
            burstiness: self.window.burstiness(),
            total_requests: self.window.count(),
            endpoint_entropy: self.endpoint_entropy(),
            error_rate,
            risk_score: self.last_risk_score,
            error_count_4xx: self.error_count_4xx,
            error_count_5xx: self.error_count_5xx,
            avg_payload_size,
        }
    }

    /// Shannon entropy in bits over the endpoint histogram, 0 when empty.
    fn endpoint_entropy(&self) -> f64 {
        if self.endpoint_counts.is_empty() {
            return 0.0;
        }

        let total: u64 = self.endpoint_counts.values().sum();
        self.endpoint_counts
            .values()
            .map(|count| {
                let prob = *count as f64 / total as f64;
                -prob * prob.log2()
            })
            .sum()
    }
}

/// Concurrent registry of per-client records keyed by fingerprint.
///
/// Two-level locking: a read/write lock over the registry map, and a mutex
/// inside each record. The registry lock is always acquired before a record
/// lock and no caller ever holds two record locks; nothing performs I/O
/// while either is held. The registry map is private so an eviction pass can
/// later be added behind the same write lock without touching callers.
pub struct TrafficAnalyzer {
    window: Duration,
    clients: RwLock<AHashMap<ClientFingerprint, Arc<Mutex<ClientStats>>>>,
}

impl TrafficAnalyzer {
    /// Creates an analyzer tracking [`DEFAULT_WINDOW`] of trailing traffic.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Creates an analyzer with a custom window span.
    pub fn with_window(window: Duration) -> Self {
        TrafficAnalyzer {
            window,
            clients: RwLock::new(AHashMap::new()),
        }
    }

    /// Records one request for `fingerprint` and returns the client's
    /// metrics as of this request.
    ///
    /// An empty `endpoint` leaves the endpoint histogram untouched and a
    /// zero `payload_size` leaves the payload ring untouched, so callers can
    /// meter requests they cannot attribute.
    pub async fn update_and_get_metrics(
        &self,
        fingerprint: ClientFingerprint,
        endpoint: &str,
        payload_size: usize,
    ) -> TrafficMetrics {
        let mut stats = self.lock_stats(fingerprint).await;

        stats.window.record();
        stats.total_requests_tracked += 1;

        if !endpoint.is_empty() {
            *stats.endpoint_counts.entry(endpoint.to_string()).or_insert(0) += 1;
        }

        if payload_size > 0 {
            stats.payload_sizes.push_back(payload_size);
            if stats.payload_sizes.len() > PAYLOAD_RING_CAPACITY {
                stats.payload_sizes.pop_front();
            }
        }

        stats.metrics()
    }

    /// Counts an upstream error against `fingerprint`. Unknown fingerprints
    /// are ignored; the caller may be reporting a response that raced an
    /// eviction in a future variant.
    pub async fn record_error(&self, fingerprint: ClientFingerprint, is_4xx: bool, is_5xx: bool) {
        if let Some(mut stats) = self.lock_existing(fingerprint).await {
            if is_4xx {
                stats.error_count_4xx += 1;
            }
            if is_5xx {
                stats.error_count_5xx += 1;
            }
        }
    }

    /// Stores the freshly computed risk score for `fingerprint`. Unknown
    /// fingerprints are ignored.
    pub async fn update_risk_score(&self, fingerprint: ClientFingerprint, score: f32) {
        if let Some(mut stats) = self.lock_existing(fingerprint).await {
            stats.last_risk_score = score;
        }
    }

    /// Metrics for every tracked client, for the dashboard.
    ///
    /// Each record is snapshotted under its own lock while the registry read
    /// lock is held, so the view is per-record-atomic but records may
    /// reflect slightly different instants.
    pub async fn snapshot_all(&self) -> Vec<(ClientFingerprint, TrafficMetrics)> {
        let clients = self.clients.read().await;
        let mut all = Vec::with_capacity(clients.len());

        for (fingerprint, stats) in clients.iter() {
            let mut stats = stats.lock().await;
            all.push((*fingerprint, stats.metrics()));
        }

        all
    }

    /// Locks the record for `fingerprint`, inserting a fresh one first if
    /// this is the client's first request. The insert re-checks under the
    /// write lock so two racing first-requests converge on one record.
    async fn lock_stats(&self, fingerprint: ClientFingerprint) -> OwnedMutexGuard<ClientStats> {
        if let Some(stats) = self.lock_existing(fingerprint).await {
            return stats;
        }

        let mut clients = self.clients.write().await;
        let stats = Arc::clone(
            clients
                .entry(fingerprint)
                .or_insert_with(|| Arc::new(Mutex::new(ClientStats::new(self.window)))),
        );
        stats.lock_owned().await
    }

    /// Locks the record for `fingerprint` if one exists. The record lock is
    /// acquired while the registry read lock is still held, preserving the
    /// registry-before-record ordering.
    async fn lock_existing(
        &self,
        fingerprint: ClientFingerprint,
    ) -> Option<OwnedMutexGuard<ClientStats>> {
        let clients = self.clients.read().await;
        match clients.get(&fingerprint) {
            Some(stats) => Some(Arc::clone(stats).lock_owned().await),
            None => None,
        }
    }
}

impl Default for TrafficAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
