//! Thread-safe metrics collection
//!
//! Atomic counters for chain runs and their attempts, plus mutex-protected
//! per-solver statistics. The chain only ever writes here; nothing reads
//! metrics to make a decision.

use crate::chain::Termination;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

const MAX_SAMPLES: usize = 1000;

/// Thread-safe metrics collector using atomics and mutexes
pub struct MetricsCollector {
    // Chain runs
    chains_started: AtomicU64,
    chains_running: AtomicU64,
    chains_succeeded: AtomicU64,
    chains_failed: AtomicU64,
    access_denials: AtomicU64,
    terminations: Mutex<HashMap<Termination, u64>>,
    chain_durations: Mutex<Vec<u64>>, // milliseconds

    // Attempts within runs
    attempts: AtomicU64,
    fetch_failures: AtomicU64,
    answers_submitted: AtomicU64,
    verdicts_correct: AtomicU64,
    verdicts_incorrect: AtomicU64,
    submission_failures: AtomicU64,

    solver_stats: Mutex<HashMap<String, SolverStats>>,

    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            chains_started: AtomicU64::new(0),
            chains_running: AtomicU64::new(0),
            chains_succeeded: AtomicU64::new(0),
            chains_failed: AtomicU64::new(0),
            access_denials: AtomicU64::new(0),
            terminations: Mutex::new(HashMap::new()),
            chain_durations: Mutex::new(Vec::new()),
            attempts: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            answers_submitted: AtomicU64::new(0),
            verdicts_correct: AtomicU64::new(0),
            verdicts_incorrect: AtomicU64::new(0),
            submission_failures: AtomicU64::new(0),
            solver_stats: Mutex::new(HashMap::new()),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    // Chain runs
    pub fn chain_started(&self) {
        self.chains_started.fetch_add(1, Ordering::Relaxed);
        self.chains_running.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chain_finished(&self, termination: Termination, duration: Duration) {
        self.chains_running.fetch_sub(1, Ordering::Relaxed);
        if termination == Termination::Completed {
            self.chains_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.chains_failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut terminations) = self.terminations.lock() {
            *terminations.entry(termination).or_insert(0) += 1;
        }
        if let Ok(mut durations) = self.chain_durations.lock() {
            push_bounded(&mut durations, duration.as_millis() as u64);
        }
    }

    pub fn access_denied(&self) {
        self.access_denials.fetch_add(1, Ordering::Relaxed);
    }

    // Attempts
    pub fn attempt_started(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn answer_submitted(&self, correct: bool) {
        self.answers_submitted.fetch_add(1, Ordering::Relaxed);
        if correct {
            self.verdicts_correct.fetch_add(1, Ordering::Relaxed);
        } else {
            self.verdicts_incorrect.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A submission that never reached a grading decision
    pub fn submission_failed(&self) {
        self.submission_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Solvers
    pub fn solver_invoked(&self, solver: &str, duration: Duration, outcome: SolverOutcome) {
        if let Ok(mut stats) = self.solver_stats.lock() {
            let entry = stats.entry(solver.to_string()).or_default();
            entry.invocations += 1;
            push_bounded(&mut entry.execution_times, duration.as_millis() as u64);
            match outcome {
                SolverOutcome::Answered => {}
                SolverOutcome::Sentinel => entry.sentinels += 1,
                SolverOutcome::Panicked => entry.panics += 1,
                SolverOutcome::TimedOut => entry.timeouts += 1,
            }
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.chains_started,
            &self.chains_running,
            &self.chains_succeeded,
            &self.chains_failed,
            &self.access_denials,
            &self.attempts,
            &self.fetch_failures,
            &self.answers_submitted,
            &self.verdicts_correct,
            &self.verdicts_incorrect,
            &self.submission_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut terminations) = self.terminations.lock() {
            terminations.clear();
        }
        if let Ok(mut durations) = self.chain_durations.lock() {
            durations.clear();
        }
        if let Ok(mut stats) = self.solver_stats.lock() {
            stats.clear();
        }
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
    }

    fn duration_statistics(&self) -> (f64, f64, f64) {
        let Ok(durations) = self.chain_durations.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if durations.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = durations.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (avg, percentile(&sorted, 50.0), percentile(&sorted, 95.0))
    }

    fn solver_snapshots(&self) -> HashMap<String, SolverStatsSnapshot> {
        self.solver_stats
            .lock()
            .map(|stats| {
                stats
                    .iter()
                    .map(|(name, stats)| (name.clone(), stats.snapshot()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg_duration_ms, p50, p95) = self.duration_statistics();
        let terminations = self
            .terminations
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default();

        MetricsSnapshot {
            chains: ChainMetrics {
                started: self.chains_started.load(Ordering::Relaxed),
                running: self.chains_running.load(Ordering::Relaxed),
                succeeded: self.chains_succeeded.load(Ordering::Relaxed),
                failed: self.chains_failed.load(Ordering::Relaxed),
                access_denials: self.access_denials.load(Ordering::Relaxed),
                terminations,
                avg_duration_ms,
                duration_p50_ms: p50,
                duration_p95_ms: p95,
            },
            attempts: AttemptMetrics {
                total: self.attempts.load(Ordering::Relaxed),
                fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
                answers_submitted: self.answers_submitted.load(Ordering::Relaxed),
                verdicts_correct: self.verdicts_correct.load(Ordering::Relaxed),
                verdicts_incorrect: self.verdicts_incorrect.load(Ordering::Relaxed),
                submission_failures: self.submission_failures.load(Ordering::Relaxed),
            },
            solvers: self.solver_snapshots(),
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// How a single solver invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverOutcome {
    Answered,
    Sentinel,
    Panicked,
    TimedOut,
}

#[derive(Debug, Default)]
struct SolverStats {
    invocations: u64,
    sentinels: u64,
    panics: u64,
    timeouts: u64,
    execution_times: Vec<u64>, // milliseconds
}

impl SolverStats {
    fn snapshot(&self) -> SolverStatsSnapshot {
        let avg_execution_time_ms = if self.execution_times.is_empty() {
            0.0
        } else {
            self.execution_times.iter().sum::<u64>() as f64 / self.execution_times.len() as f64
        };

        SolverStatsSnapshot {
            invocations: self.invocations,
            sentinels: self.sentinels,
            panics: self.panics,
            timeouts: self.timeouts,
            avg_execution_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub chains: ChainMetrics,
    pub attempts: AttemptMetrics,
    pub solvers: HashMap<String, SolverStatsSnapshot>,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct ChainMetrics {
    pub started: u64,
    pub running: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub access_denials: u64,
    pub terminations: HashMap<Termination, u64>,
    pub avg_duration_ms: f64,
    pub duration_p50_ms: f64,
    pub duration_p95_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct AttemptMetrics {
    pub total: u64,
    pub fetch_failures: u64,
    pub answers_submitted: u64,
    pub verdicts_correct: u64,
    pub verdicts_incorrect: u64,
    pub submission_failures: u64,
}

#[derive(Debug, Serialize)]
pub struct SolverStatsSnapshot {
    pub invocations: u64,
    pub sentinels: u64,
    pub panics: u64,
    pub timeouts: u64,
    pub avg_execution_time_ms: f64,
}

fn push_bounded(samples: &mut Vec<u64>, value: u64) {
    samples.push(value);
    if samples.len() > MAX_SAMPLES {
        samples.remove(0);
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;

    lower + (upper - lower) * index.fract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_chain_metrics() {
        let collector = MetricsCollector::new();

        collector.chain_started();
        collector.attempt_started();
        collector.answer_submitted(true);
        collector.chain_finished(Termination::Completed, Duration::from_millis(1500));

        collector.chain_started();
        collector.attempt_started();
        collector.fetch_failed();
        collector.chain_finished(Termination::FetchFailed, Duration::from_millis(10));

        let metrics = collector.get_metrics();
        assert_eq!(metrics.chains.started, 2);
        assert_eq!(metrics.chains.running, 0);
        assert_eq!(metrics.chains.succeeded, 1);
        assert_eq!(metrics.chains.failed, 1);
        assert_eq!(metrics.chains.terminations[&Termination::FetchFailed], 1);
        assert_eq!(metrics.attempts.total, 2);
        assert_eq!(metrics.attempts.verdicts_correct, 1);
        assert_eq!(metrics.attempts.fetch_failures, 1);
        assert!(metrics.chains.avg_duration_ms > 700.0);
    }

    #[test]
    fn test_solver_metrics() {
        let collector = MetricsCollector::new();

        collector.solver_invoked("csv_sum", Duration::from_millis(500), SolverOutcome::Answered);
        collector.solver_invoked("csv_sum", Duration::from_millis(300), SolverOutcome::Sentinel);
        collector.solver_invoked("audio_transcription", Duration::ZERO, SolverOutcome::TimedOut);

        let metrics = collector.get_metrics();
        let csv = &metrics.solvers["csv_sum"];
        assert_eq!(csv.invocations, 2);
        assert_eq!(csv.sentinels, 1);
        assert!((csv.avg_execution_time_ms - 400.0).abs() < f64::EPSILON);
        assert_eq!(metrics.solvers["audio_transcription"].timeouts, 1);
    }

    #[test]
    fn test_snapshot_serializes_termination_keys() {
        let collector = MetricsCollector::new();
        collector.chain_started();
        collector.chain_finished(Termination::AttemptCeiling, Duration::ZERO);

        let json = serde_json::to_value(collector.get_metrics()).unwrap();
        assert_eq!(json["chains"]["terminations"]["attempt_ceiling"], 1);
    }

    #[test]
    fn test_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for _ in 0..100 {
                        collector.attempt_started();
                        collector.answer_submitted(false);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = collector.get_metrics();
        assert_eq!(metrics.attempts.total, 1000);
        assert_eq!(metrics.attempts.verdicts_incorrect, 1000);
    }

    #[test]
    fn test_percentile_calculation() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        assert!((percentile(&data, 50.0) - 5.5).abs() < 0.1);
        assert!((percentile(&data, 95.0) - 9.55).abs() < 0.1);
        assert!((percentile(&data, 0.0) - 1.0).abs() < 0.1);
        assert!((percentile(&data, 100.0) - 10.0).abs() < 0.1);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_reset_functionality() {
        let collector = MetricsCollector::new();

        collector.chain_started();
        collector.access_denied();
        collector.solver_invoked("scrape_secret", Duration::from_millis(1), SolverOutcome::Panicked);

        collector.reset();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.chains.started, 0);
        assert_eq!(metrics.chains.access_denials, 0);
        assert!(metrics.solvers.is_empty());
    }
}
