//! Opt-in interval profiler for inference stages.
//!
//! Each named operation cycles `idle -> running -> idle`: [`Profiler::start`]
//! opens an interval, [`Profiler::end`] closes it and records the elapsed time.
//! Starting a name that is already running replaces the pending start, so the
//! unterminated interval is dropped. Nesting the same name is not supported.
//!
//! A disabled profiler ignores every call and allocates nothing.
//!
//! The profiler takes `&mut self` for every mutation and does no locking.
//! Threads that need timing should each own a profiler, or wrap a shared one in
//! a lock themselves.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::OptimizationConfig;

/// Returned by [`Profiler::report`] when there is nothing to show.
pub const EMPTY_REPORT: &str = "Profiling not enabled or no metrics collected.";

/// First line of a non-empty [`Profiler::report`].
pub const REPORT_HEADER: &str = "=== Performance Report ===";

#[derive(Debug)]
struct OperationMetrics {
    name: String,
    samples: Vec<Duration>,
    pending: Option<Instant>,
}

/// Summary of the completed intervals of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationStats {
    /// Operation name as passed to [`Profiler::start`].
    pub name: String,
    /// Number of completed intervals.
    pub count: usize,
    /// Mean interval, truncated to whole nanoseconds.
    pub avg: Duration,
    /// Shortest interval.
    pub min: Duration,
    /// Longest interval.
    pub max: Duration,
}

impl OperationStats {
    fn from_samples(name: &str, samples: &[Duration]) -> Option<Self> {
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let total: Duration = samples.iter().sum();
        let avg_nanos = total.as_nanos() / samples.len() as u128;

        Some(Self {
            name: name.to_string(),
            count: samples.len(),
            avg: Duration::from_nanos(avg_nanos as u64),
            min,
            max,
        })
    }

    /// One report line, durations in milliseconds with two decimals.
    pub fn report_line(&self) -> String {
        format!(
            "{}: avg={:.2}ms, min={:.2}ms, max={:.2}ms, count={}",
            self.name,
            as_millis(self.avg),
            as_millis(self.min),
            as_millis(self.max),
            self.count
        )
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Collects named interval timings.
#[derive(Debug, Default)]
pub struct Profiler {
    enabled: bool,
    // Insertion order of first `start`, which is also report order.
    operations: Vec<OperationMetrics>,
    index: HashMap<String, usize>,
}

impl Profiler {
    /// An empty profiler; when `enabled` is false every call is a no-op.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// A profiler enabled according to `config.enable_profiling`.
    pub fn from_config(config: &OptimizationConfig) -> Self {
        Self::new(config.enable_profiling)
    }

    /// Whether timings are being collected.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open an interval for `name`, replacing any pending one.
    pub fn start(&mut self, name: &str) {
        if !self.enabled {
            return;
        }

        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.operations.push(OperationMetrics {
                    name: name.to_string(),
                    samples: Vec::new(),
                    pending: None,
                });
                let slot = self.operations.len() - 1;
                self.index.insert(name.to_string(), slot);
                slot
            }
        };

        if self.operations[slot].pending.replace(Instant::now()).is_some() {
            debug!(operation = name, "Restarted running interval; previous start discarded");
        }
    }

    /// Close the interval for `name` and record its duration.
    ///
    /// Ignored if `name` is not running.
    pub fn end(&mut self, name: &str) {
        if !self.enabled {
            return;
        }

        let Some(&slot) = self.index.get(name) else {
            return;
        };
        let operation = &mut self.operations[slot];
        if let Some(started) = operation.pending.take() {
            operation.samples.push(started.elapsed());
        }
    }

    /// Time `f` as one interval of `name`.
    pub fn measure<T, F>(&mut self, name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.start(name);
        let result = f();
        self.end(name);
        result
    }

    /// Start `name` and return a guard that ends it when dropped.
    pub fn scope(&mut self, name: &str) -> ProfileScope<'_> {
        self.start(name);
        ProfileScope {
            name: name.to_string(),
            profiler: self,
        }
    }

    /// Statistics for every operation with at least one completed interval,
    /// in the order each was first started.
    pub fn stats(&self) -> Vec<OperationStats> {
        self.operations
            .iter()
            .filter_map(|op| OperationStats::from_samples(&op.name, &op.samples))
            .collect()
    }

    /// Statistics for one operation, if it has completed intervals.
    pub fn stats_for(&self, name: &str) -> Option<OperationStats> {
        let op = &self.operations[*self.index.get(name)?];
        OperationStats::from_samples(&op.name, &op.samples)
    }

    /// Human-readable summary: a header and one line per operation.
    pub fn report(&self) -> String {
        let stats = if self.enabled { self.stats() } else { Vec::new() };
        if stats.is_empty() {
            return EMPTY_REPORT.to_string();
        }

        std::iter::once(REPORT_HEADER.to_string())
            .chain(stats.iter().map(OperationStats::report_line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Emit one `info` event per profiled operation.
    pub fn log_report(&self) {
        if !self.enabled {
            return;
        }

        for stat in self.stats() {
            info!(
                operation = %stat.name,
                count = stat.count,
                avg_ms = as_millis(stat.avg),
                min_ms = as_millis(stat.min),
                max_ms = as_millis(stat.max),
                "Profiled operation"
            );
        }
    }

    /// Drop everything collected so far.
    pub fn reset(&mut self) {
        self.operations.clear();
        self.index.clear();
    }
}

/// Ends its operation on drop. Created by [`Profiler::scope`].
#[must_use = "the interval ends as soon as the guard is dropped"]
pub struct ProfileScope<'a> {
    profiler: &'a mut Profiler,
    name: String,
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        self.profiler.end(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pause() {
        thread::sleep(Duration::from_millis(2));
    }

    #[test]
    fn test_disabled_profiler_is_inert() {
        let mut profiler = Profiler::new(false);
        profiler.start("x");
        pause();
        profiler.end("x");
        profiler.end("never-started");

        assert!(!profiler.is_enabled());
        assert!(profiler.stats().is_empty());
        assert_eq!(profiler.report(), EMPTY_REPORT);
    }

    #[test]
    fn test_empty_enabled_report() {
        let profiler = Profiler::new(true);
        assert_eq!(profiler.report(), EMPTY_REPORT);
    }

    #[test]
    fn test_two_intervals_reported() {
        let mut profiler = Profiler::new(true);
        for _ in 0..2 {
            profiler.start("x");
            pause();
            profiler.end("x");
        }

        let stats = profiler.stats_for("x").unwrap();
        assert_eq!(stats.count, 2);
        assert!(stats.min <= stats.avg && stats.avg <= stats.max);
        assert!(stats.min >= Duration::from_millis(2));

        let report = profiler.report();
        let mut lines = report.lines();
        assert_eq!(lines.next(), Some(REPORT_HEADER));
        let line = lines.next().unwrap();
        assert!(line.starts_with("x: avg="));
        assert!(line.ends_with("count=2"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_end_without_start_is_ignored() {
        let mut profiler = Profiler::new(true);
        profiler.start("x");
        profiler.end("x");
        let before = profiler.stats();

        profiler.end("y");
        assert_eq!(profiler.stats(), before);
        assert!(profiler.stats_for("y").is_none());
    }

    #[test]
    fn test_second_end_does_not_record_again() {
        let mut profiler = Profiler::new(true);
        profiler.start("x");
        profiler.end("x");
        profiler.end("x");
        assert_eq!(profiler.stats_for("x").unwrap().count, 1);
    }

    #[test]
    fn test_restart_discards_pending_start() {
        let mut profiler = Profiler::new(true);
        profiler.start("x");
        thread::sleep(Duration::from_millis(30));
        profiler.start("x");
        profiler.end("x");

        let stats = profiler.stats_for("x").unwrap();
        assert_eq!(stats.count, 1);
        assert!(stats.max < Duration::from_millis(30));
    }

    #[test]
    fn test_report_keeps_first_start_order() {
        let mut profiler = Profiler::new(true);
        profiler.start("load");
        profiler.start("convert");
        profiler.end("convert");
        profiler.end("load");
        profiler.start("load");
        profiler.end("load");
        profiler.start("idle"); // never ended, not reported

        let names: Vec<_> = profiler.stats().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["load", "convert"]);

        let report = profiler.report();
        assert_eq!(report.lines().count(), 3);
        assert!(!report.contains("idle"));
    }

    #[test]
    fn test_measure_and_scope() {
        let mut profiler = Profiler::new(true);
        let value = profiler.measure("compute", || {
            pause();
            42
        });
        assert_eq!(value, 42);

        {
            let _scope = profiler.scope("compute");
            pause();
        }

        assert_eq!(profiler.stats_for("compute").unwrap().count, 2);
    }

    #[test]
    fn test_from_config_and_reset() {
        let config = OptimizationConfig {
            enable_profiling: true,
            ..OptimizationConfig::default()
        };
        let mut profiler = Profiler::from_config(&config);
        assert!(profiler.is_enabled());
        assert!(!Profiler::from_config(&OptimizationConfig::default()).is_enabled());

        profiler.measure("x", || ());
        profiler.reset();
        assert_eq!(profiler.report(), EMPTY_REPORT);
    }

    #[test]
    fn test_report_line_format() {
        let stats = OperationStats {
            name: "inference".to_string(),
            count: 3,
            avg: Duration::from_micros(12_346),
            min: Duration::from_millis(10),
            max: Duration::from_micros(15_007),
        };
        assert_eq!(
            stats.report_line(),
            "inference: avg=12.35ms, min=10.00ms, max=15.01ms, count=3"
        );
    }
}
