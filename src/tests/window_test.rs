#[cfg(test)]
mod tests {
    use crate::analysis::window::SlidingWindow;
    use std::time::{Duration, Instant};

    #[test]
    fn empty_window_reads_zero() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        assert_eq!(window.count(), 0);
        assert_eq!(window.rate(), 0.0);
        assert_eq!(window.burstiness(), 0.0);
    }

    #[test]
    fn single_arrival_has_zero_burstiness() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        window.record_at(base);
        assert_eq!(window.count_at(base), 1);
        assert_eq!(window.burstiness_at(base), 0.0);
    }

    #[test]
    fn rate_averages_over_the_full_window_span() {
        // 30 arrivals packed into 300ms still average over the whole 60s
        // window, so a startup burst never reads as a sustained rate.
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        for i in 0..30u64 {
            window.record_at(base + Duration::from_millis(i * 10));
        }
        let rate = window.rate_at(base + Duration::from_millis(300));
        assert!((rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn arrivals_older_than_the_window_are_pruned() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        window.record_at(base);
        window.record_at(base + Duration::from_secs(30));

        assert_eq!(window.count_at(base + Duration::from_secs(61)), 1);
        assert_eq!(window.count_at(base + Duration::from_secs(120)), 0);
        assert_eq!(window.rate_at(base + Duration::from_secs(120)), 0.0);
    }

    #[test]
    fn arrival_exactly_at_the_window_edge_is_retained() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        window.record_at(base);
        assert_eq!(window.count_at(base + Duration::from_secs(60)), 1);
    }

    #[test]
    fn metronome_arrivals_have_zero_variance() {
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        for i in 0..10u64 {
            window.record_at(base + Duration::from_millis(i * 100));
        }
        let burstiness = window.burstiness_at(base + Duration::from_secs(1));
        assert!(burstiness.abs() < 1e-9);
    }

    #[test]
    fn alternating_gaps_produce_the_expected_variance() {
        // Intervals of 100ms and 300ms around a 200ms mean: every squared
        // deviation is 100², so the population variance is exactly 10000.
        let mut window = SlidingWindow::new(Duration::from_secs(60));
        let base = Instant::now();
        for offset_ms in [0u64, 100, 400, 500, 800] {
            window.record_at(base + Duration::from_millis(offset_ms));
        }
        let burstiness = window.burstiness_at(base + Duration::from_millis(800));
        assert!((burstiness - 10_000.0).abs() < 1e-6);
    }
}
