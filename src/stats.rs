use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-run counters, threaded through the executor and the scheduler instead
/// of living in globals so concurrent runs stay independent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Sampling rounds performed.
    pub rounds: u64,
    /// Wall-clock spent in batched sampling, in milliseconds.
    pub batched_millis: u64,
    /// Wall-clock of the final non-batched execution, if one ran.
    pub non_batched_millis: Option<u64>,
    /// Non-batched fallback attempts, including timed-out ones.
    pub fallback_attempts: u64,
    /// Whether the learning loop ran at all (false under the hybrid bypass).
    pub used_learning: bool,
    /// Whether the run ended through a non-batched execution rather than by
    /// exhausting all batches.
    pub finished_non_batched: bool,
    /// Successful batch finalizations.
    pub progress_updates: u64,

    #[serde(skip)]
    attempts_per_timeout: BTreeMap<u64, u64>,
    #[serde(skip)]
    successes_per_timeout: BTreeMap<u64, u64>,
}

impl RunStats {
    pub fn record_attempt(&mut self, timeout_ms: u64, success: bool) {
        *self.attempts_per_timeout.entry(timeout_ms).or_insert(0) += 1;
        if success {
            *self.successes_per_timeout.entry(timeout_ms).or_insert(0) += 1;
        }
    }

    pub fn attempts(&self, timeout_ms: u64) -> u64 {
        self.attempts_per_timeout
            .get(&timeout_ms)
            .copied()
            .unwrap_or(0)
    }

    pub fn successes(&self, timeout_ms: u64) -> u64 {
        self.successes_per_timeout
            .get(&timeout_ms)
            .copied()
            .unwrap_or(0)
    }

    pub fn log_attempt_histogram(&self) {
        debug!(
            "attempts per timeout: {}",
            self.attempts_per_timeout
                .iter()
                .map(|(timeout, attempts)| {
                    let successes = self.successes(*timeout);
                    format!("{}ms={}/{}", timeout, successes, attempts)
                })
                .join(" ")
        );
    }
}
