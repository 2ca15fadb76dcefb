//! Runtime knobs for intra-query join-order learning. Defaults follow the
//! settings we found robust across the benchmark workloads.

use crate::reward::RewardModel;
use strum_macros::{Display, EnumString};

/// Identifier pieces for the auxiliary tables and columns the executor
/// creates inside the external engine. Prefixed to avoid clashing with user
/// schemas.
pub mod naming {
    pub const PREFIX: &str = "rlj";
    pub const JOIN_TABLE_PREFIX: &str = "rljjoined";
    pub const FINAL_TABLE_PREFIX: &str = "rljresult";
    pub const BATCH_ID_COLUMN: &str = "rljbatchid";
    pub const BATCH_TABLE_SUFFIX: &str = "nextbatch";

    pub fn batch_table(alias: &str) -> String {
        format!("{}{}", alias, BATCH_TABLE_SUFFIX)
    }

    pub fn batch_index(table: &str) -> String {
        format!("{}idx{}{}", PREFIX, table, BATCH_ID_COLUMN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LearningPolicy {
    /// UCT over the join-order tree.
    Uct,
    /// BRUE with a per-round select-switch depth.
    Brue,
    /// No learning, delegate ordering to the external engine.
    EngineOpt,
}

#[derive(Debug, Clone)]
pub struct JoinConfig {
    pub policy: LearningPolicy,

    /// Number of per-table batches each base table is partitioned into.
    pub batch_count: u32,
    /// Delete processed rows from the source tables instead of tracking
    /// finished batches per result row.
    pub delete_processed: bool,
    /// Materialize the active batches into staging tables before joining.
    pub materialize_batches: bool,
    /// Whether sampled executions run under an engine-enforced timeout.
    pub hard_timeout: bool,
    /// Round count after which hard timeouts are softened to wall-clock
    /// checks.
    pub soften_timeout_after: u64,

    /// Smallest timeout of the pyramid, in milliseconds.
    pub timeout_base_ms: u64,
    /// Geometric growth factor between pyramid levels.
    pub timeout_scale_up: f64,
    /// Number of pyramid levels.
    pub timeout_levels: usize,

    /// Batches loaded per table outside of greedy scale-up.
    pub default_load_count: u32,
    /// Empty staging attempts tolerated before probing for a non-empty batch.
    pub staging_probe_threshold: u32,
    /// Create a batch-id index once the todo fraction drops below this.
    pub batch_index_threshold: f64,
    /// Chance of re-picking batches after a failed attempt.
    pub batch_reload_probability: f64,

    /// Upper bound on greedy repeat executions per sample.
    pub max_greedy_executions: u64,
    /// Greedy repetition stops once the scaled timeout exceeds this.
    pub greedy_timeout_ceiling_ms: u64,
    pub greedy_time_scale_up: f64,
    pub greedy_max_time_factor: f64,
    pub greedy_batch_scale_up: u32,
    pub greedy_max_batches: u32,

    /// UCT exploration constant.
    pub exploration: f64,
    pub reward_model: RewardModel,
    /// Restrict action choice to tables connected to the joined prefix.
    pub avoid_cartesian: bool,

    /// Sampling rounds before the first non-batched fallback attempt.
    pub initial_rounds_to_switch: u64,
    pub rounds_to_switch_scale_up: u64,
    /// Bound each fallback attempt by the elapsed batched time and return to
    /// sampling on timeout. When false the fallback commits without a bound.
    pub bounded_fallback: bool,

    /// Timeout for the delegated (engine-optimized) execution phase.
    pub per_phase_timeout_ms: u64,
    /// When positive, try the engine-optimized plan under this bound before
    /// learning at all.
    pub learning_threshold_ms: u64,

    pub log_progress_every: u64,
    pub log_dominant_every: u64,
    pub seed: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            policy: LearningPolicy::Brue,
            batch_count: 10000,
            delete_processed: false,
            materialize_batches: true,
            hard_timeout: true,
            soften_timeout_after: u64::MAX,
            timeout_base_ms: 20,
            timeout_scale_up: 2.0,
            timeout_levels: 7,
            default_load_count: 1,
            staging_probe_threshold: 5,
            batch_index_threshold: 1.0,
            batch_reload_probability: 0.1,
            max_greedy_executions: 1,
            greedy_timeout_ceiling_ms: 40,
            greedy_time_scale_up: 5.0,
            greedy_max_time_factor: 5.0,
            greedy_batch_scale_up: 5,
            greedy_max_batches: 5,
            exploration: std::f64::consts::SQRT_2,
            reward_model: RewardModel::Binary,
            avoid_cartesian: true,
            initial_rounds_to_switch: 5000,
            rounds_to_switch_scale_up: 2,
            bounded_fallback: false,
            per_phase_timeout_ms: 60000,
            learning_threshold_ms: 0,
            log_progress_every: 100,
            log_dominant_every: 100,
            seed: 0,
        }
    }
}

impl JoinConfig {
    pub fn with_policy(mut self, policy: LearningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_count(mut self, batch_count: u32) -> Self {
        self.batch_count = batch_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_timeout_base_ms(mut self, timeout_base_ms: u64) -> Self {
        self.timeout_base_ms = timeout_base_ms;
        self
    }

    pub fn with_initial_rounds_to_switch(mut self, rounds: u64) -> Self {
        self.initial_rounds_to_switch = rounds;
        self
    }

    pub fn with_bounded_fallback(mut self, bounded_fallback: bool) -> Self {
        self.bounded_fallback = bounded_fallback;
        self
    }

    pub fn with_learning_threshold_ms(mut self, learning_threshold_ms: u64) -> Self {
        self.learning_threshold_ms = learning_threshold_ms;
        self
    }

    pub fn with_reward_model(mut self, reward_model: RewardModel) -> Self {
        self.reward_model = reward_model;
        self
    }

    pub fn with_hard_timeout(mut self, hard_timeout: bool) -> Self {
        self.hard_timeout = hard_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_policy_names_round_trip() {
        for policy in [
            LearningPolicy::Uct,
            LearningPolicy::Brue,
            LearningPolicy::EngineOpt,
        ] {
            assert_eq!(
                LearningPolicy::from_str(&policy.to_string()).unwrap(),
                policy
            );
        }
        assert_eq!(LearningPolicy::Brue.to_string(), "brue");
        assert_eq!(LearningPolicy::EngineOpt.to_string(), "engine_opt");
    }

    #[test]
    fn test_batch_table_naming() {
        assert_eq!(naming::batch_table("t"), "tnextbatch");
        assert_eq!(naming::batch_index("info"), "rljidxinforljbatchid");
    }
}
