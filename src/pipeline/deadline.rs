//! Per-tick deadline supervision.
//!
//! Measures each tick's load + preprocess + (train | predict) span
//! against the configured tick period. Violations are reported and
//! counted, never fatal: lateness has external consequences this core
//! cannot control, but alignment and model versioning stay correct
//! regardless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub struct DeadlineMonitor {
    period: Duration,
    ticks: AtomicU64,
    violations: AtomicU64,
    worst_us: AtomicU64,
}

impl DeadlineMonitor {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticks: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            worst_us: AtomicU64::new(0),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start measuring one tick.
    pub fn begin(&self, index: usize) -> TickTimer<'_> {
        TickTimer {
            monitor: self,
            index,
            started: Instant::now(),
        }
    }

    pub fn stats(&self) -> DeadlineStats {
        DeadlineStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            worst_ms: self.worst_us.load(Ordering::Relaxed) as f32 / 1000.0,
        }
    }

    fn record(&self, index: usize, elapsed: Duration) -> DeadlineReport {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.worst_us
            .fetch_max(elapsed.as_micros() as u64, Ordering::Relaxed);

        let overran = elapsed > self.period;
        if overran {
            self.violations.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "tick {} exceeded its period: {:.1} ms elapsed, {:.1} ms allowed",
                index,
                elapsed.as_secs_f64() * 1000.0,
                self.period.as_secs_f64() * 1000.0
            );
        }
        DeadlineReport {
            elapsed,
            period: self.period,
            overran,
        }
    }
}

/// Live measurement for one tick; consumed by `finish`.
pub struct TickTimer<'a> {
    monitor: &'a DeadlineMonitor,
    index: usize,
    started: Instant,
}

impl TickTimer<'_> {
    pub fn finish(self) -> DeadlineReport {
        self.monitor.record(self.index, self.started.elapsed())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeadlineReport {
    pub elapsed: Duration,
    pub period: Duration,
    pub overran: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineStats {
    pub ticks: u64,
    pub violations: u64,
    pub worst_ms: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_violation_counted_not_fatal() {
        let monitor = DeadlineMonitor::new(Duration::from_millis(5));
        let timer = monitor.begin(0);
        thread::sleep(Duration::from_millis(15));
        let report = timer.finish();

        assert!(report.overran);
        let stats = monitor.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.violations, 1);
        assert!(stats.worst_ms >= 5.0);
    }

    #[test]
    fn test_fast_tick_is_clean() {
        let monitor = DeadlineMonitor::new(Duration::from_secs(10));
        let report = monitor.begin(3).finish();

        assert!(!report.overran);
        let stats = monitor.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.violations, 0);
    }
}
