use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Bounded time-window counter of request arrival instants.
///
/// Holds the monotonic arrival instants of a single client's requests, in
/// arrival order, and drops everything older than the window parameter `W`
/// before any mutation or query. After every operation each retained instant
/// `t` satisfies `now - t <= W`.
///
/// The window is not internally synchronized; the owning client record's
/// lock serializes access.
pub struct SlidingWindow {
    window: Duration,
    arrivals: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Creates a window spanning `window` of trailing time.
    pub fn new(window: Duration) -> Self {
        SlidingWindow {
            window,
            arrivals: VecDeque::new(),
        }
    }

    /// Records an arrival at the current instant.
    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }

    /// Number of arrivals currently retained.
    pub fn count(&mut self) -> usize {
        self.count_at(Instant::now())
    }

    /// Requests per second averaged over the full window span.
    ///
    /// Deliberately divides by `W` even while the window is still filling,
    /// so a burst right after startup does not read as a high sustained
    /// rate.
    pub fn rate(&mut self) -> f64 {
        self.rate_at(Instant::now())
    }

    /// Population variance of the inter-arrival intervals, in milliseconds
    /// squared. Returns 0 with fewer than two retained arrivals.
    ///
    /// Scripted clients produce near-zero variance; human bursts produce
    /// large variance. The scorer reads this bimodally.
    pub fn burstiness(&mut self) -> f64 {
        self.burstiness_at(Instant::now())
    }

    pub(crate) fn record_at(&mut self, now: Instant) {
        self.prune(now);
        self.arrivals.push_back(now);
    }

    pub(crate) fn count_at(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.arrivals.len()
    }

    pub(crate) fn rate_at(&mut self, now: Instant) -> f64 {
        self.prune(now);
        self.arrivals.len() as f64 / self.window.as_secs_f64()
    }

    pub(crate) fn burstiness_at(&mut self, now: Instant) -> f64 {
        self.prune(now);
        if self.arrivals.len() < 2 {
            return 0.0;
        }

        let intervals: Vec<f64> = self
            .arrivals
            .iter()
            .zip(self.arrivals.iter().skip(1))
            .map(|(earlier, later)| later.duration_since(*earlier).as_secs_f64() * 1000.0)
            .collect();

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let sq_sum = intervals
            .iter()
            .map(|interval| (interval - mean) * (interval - mean))
            .sum::<f64>();

        sq_sum / intervals.len() as f64
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.arrivals.front() {
            if now.duration_since(*front) > self.window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }
    }
}
