use std::fmt;
use std::time::Instant;
use tracing::info;

/// Width of one histogram bucket in nanoseconds.
pub const BUCKET_WIDTH_NS: u64 = 100;
/// Number of linear buckets. Together with the bucket width this covers
/// [0, 1 ms); anything slower lands in the last (overflow) bucket.
pub const NUM_BUCKETS: usize = 10_000;

/// Fixed linear-bucket latency histogram.
///
/// Owned by a single thread (the strategy thread records its tick-to-decision
/// spans into it), so no locks; the bucket array is allocated once at
/// construction, so no runtime allocation either. Samples are nanoseconds.
pub struct LatencyHistogram {
    name: String,
    buckets: Box<[u64]>,
    count: u64,
    min_ns: u64,
    max_ns: u64,
    started: Option<Instant>,
}

impl LatencyHistogram {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buckets: vec![0u64; NUM_BUCKETS].into_boxed_slice(),
            count: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            started: None,
        }
    }

    /// Mark the start of a measured span.
    #[inline]
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the span opened by [`start`](Self::start) and record it.
    /// A stop without a matching start is ignored.
    #[inline]
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed().as_nanos() as u64);
        }
    }

    /// Record one sample in nanoseconds.
    #[inline]
    pub fn record(&mut self, ns: u64) {
        self.count += 1;
        if ns < self.min_ns {
            self.min_ns = ns;
        }
        if ns > self.max_ns {
            self.max_ns = ns;
        }
        let idx = ((ns / BUCKET_WIDTH_NS) as usize).min(NUM_BUCKETS - 1);
        self.buckets[idx] += 1;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn min_ns(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.min_ns
        }
    }

    #[inline]
    pub fn max_ns(&self) -> u64 {
        self.max_ns
    }

    /// Total of all bucket frequencies. Always equals `count()`.
    pub fn bucket_total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Upper edge (ns) of the bucket holding the sample at `fraction` of the
    /// population (rank percentile). Zero when empty.
    pub fn percentile_ns(&self, fraction: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let target = ((self.count as f64) * fraction).ceil() as u64;
        let mut accumulated = 0u64;
        for (idx, &freq) in self.buckets.iter().enumerate() {
            accumulated += freq;
            if accumulated >= target {
                return (idx as u64 + 1) * BUCKET_WIDTH_NS;
            }
        }
        NUM_BUCKETS as u64 * BUCKET_WIDTH_NS
    }

    /// Summarize the distribution.
    pub fn report(&self) -> LatencyReport {
        LatencyReport {
            name: self.name.clone(),
            count: self.count,
            min_ns: self.min_ns(),
            max_ns: self.max_ns,
            p50_ns: self.percentile_ns(0.50),
            p99_ns: self.percentile_ns(0.99),
            p999_ns: self.percentile_ns(0.999),
        }
    }

    /// Emit the report plus a compressed distribution (1 us groups over the
    /// first 20 us) through `tracing`.
    pub fn log_report(&self) {
        let report = self.report();
        info!("=== latency report: {} ===", report.name);
        info!("samples: {}", report.count);
        if report.count == 0 {
            return;
        }
        info!("min: {} ns", report.min_ns);
        info!("max: {} ns", report.max_ns);
        info!("p50: {} ns ({:.1} us)", report.p50_ns, report.p50_ns as f64 / 1000.0);
        info!("p99: {} ns ({:.1} us)", report.p99_ns, report.p99_ns as f64 / 1000.0);
        info!(
            "p99.9: {} ns ({:.1} us)",
            report.p999_ns,
            report.p999_ns as f64 / 1000.0
        );

        const GROUP: usize = 10; // 10 buckets x 100 ns = 1 us per row
        for us in 0..20 {
            let group_count: u64 = self.buckets[us * GROUP..(us + 1) * GROUP].iter().sum();
            if group_count == 0 {
                continue;
            }
            let mut bars = (group_count * 50 / self.count) as usize;
            if bars == 0 {
                bars = 1;
            }
            info!("{:>3}-{:<3} us: {} ({})", us, us + 1, "#".repeat(bars), group_count);
        }
    }
}

impl fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("name", &self.name)
            .field("count", &self.count)
            .field("min_ns", &self.min_ns())
            .field("max_ns", &self.max_ns)
            .finish()
    }
}

/// Percentile summary produced by [`LatencyHistogram::report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyReport {
    pub name: String,
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: n={} min={}ns p50={}ns p99={}ns p99.9={}ns max={}ns",
            self.name, self.count, self.min_ns, self.p50_ns, self.p99_ns, self.p999_ns, self.max_ns
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_report() {
        let hist = LatencyHistogram::new("empty");
        let report = hist.report();
        assert_eq!(report.count, 0);
        assert_eq!(report.min_ns, 0);
        assert_eq!(report.max_ns, 0);
        assert_eq!(report.p50_ns, 0);
    }

    #[test]
    fn test_bucket_total_matches_count() {
        let mut hist = LatencyHistogram::new("totals");
        for i in 0..10_000u64 {
            hist.record(i * 37 % 2_000_000);
        }
        assert_eq!(hist.bucket_total(), hist.count());
    }

    #[test]
    fn test_percentile_upper_edge() {
        let mut hist = LatencyHistogram::new("edges");
        // 100 samples all in bucket 4 ([400, 500) ns).
        for _ in 0..100 {
            hist.record(450);
        }
        assert_eq!(hist.percentile_ns(0.50), 500);
        assert_eq!(hist.percentile_ns(0.99), 500);
        assert_eq!(hist.min_ns(), 450);
        assert_eq!(hist.max_ns(), 450);
    }

    #[test]
    fn test_percentile_ordering_invariant() {
        let mut hist = LatencyHistogram::new("ordering");
        for i in 1..=1000u64 {
            hist.record(i * 100);
        }
        let report = hist.report();
        assert!(report.p50_ns <= report.p99_ns);
        assert!(report.p99_ns <= report.p999_ns);
        assert!(report.min_ns <= report.p50_ns);
        assert!(report.p50_ns <= report.max_ns + BUCKET_WIDTH_NS);
    }

    #[test]
    fn test_overflow_bucket() {
        let mut hist = LatencyHistogram::new("overflow");
        hist.record(5_000_000); // 5 ms, beyond the 1 ms range
        hist.record(999_999_999);
        assert_eq!(hist.count(), 2);
        assert_eq!(hist.bucket_total(), 2);
        // Both land in the overflow bucket; the reported percentile caps at
        // the histogram range.
        assert_eq!(hist.percentile_ns(0.5), NUM_BUCKETS as u64 * BUCKET_WIDTH_NS);
    }

    #[test]
    fn test_start_stop_records_elapsed() {
        let mut hist = LatencyHistogram::new("span");
        hist.start();
        thread::sleep(Duration::from_micros(100));
        hist.stop();
        assert_eq!(hist.count(), 1);
        assert!(hist.max_ns() >= 100_000);

        // Stop without start is a no-op.
        hist.stop();
        assert_eq!(hist.count(), 1);
    }

    #[test]
    fn test_log_report_renders_distribution() {
        let mut hist = LatencyHistogram::new("render");
        hist.log_report();
        for i in 0..500u64 {
            hist.record(i * 40);
        }
        hist.log_report();
    }

    #[test]
    fn test_known_distribution_percentiles() {
        let mut hist = LatencyHistogram::new("dist");
        // 90 samples at ~200 ns, 10 samples at ~10 us.
        for _ in 0..90 {
            hist.record(250);
        }
        for _ in 0..10 {
            hist.record(10_050);
        }
        assert_eq!(hist.percentile_ns(0.50), 300);
        assert_eq!(hist.percentile_ns(0.99), 10_100);
    }
}
