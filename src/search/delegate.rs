use crate::config::JoinConfig;
use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use log::info;

/// No learning: hand the whole join to the engine's own optimizer once and
/// report completion. Useful as a baseline and for queries known to be easy.
pub struct DelegateSearch {
    sql: String,
    table_count: usize,
    per_phase_timeout_ms: u64,
    attempted: bool,
    completed: bool,
}

impl DelegateSearch {
    pub fn new<E: ExecEngine>(executor: &BatchedExecutor<E>, table_count: usize, config: &JoinConfig) -> Self {
        Self {
            sql: executor.traditional_sql(),
            table_count,
            per_phase_timeout_ms: config.per_phase_timeout_ms,
            attempted: false,
            completed: false,
        }
    }

    pub fn sample<E: ExecEngine>(
        &mut self,
        executor: &mut BatchedExecutor<E>,
    ) -> EngineResult<f64> {
        let engine = executor.engine_mut();
        engine.set_batch_mode(false)?;
        engine.set_join_reordering(true)?;
        info!("delegating join ordering to the engine");
        let success = engine.execute_or_timeout(&self.sql, self.per_phase_timeout_ms)?;
        self.attempted = true;
        self.completed = success;
        Ok(if success { 1.0 } else { 0.0 })
    }

    /// Identity order; the engine decides the real one.
    pub fn dominant_order(&self) -> Vec<usize> {
        (0..self.table_count).collect()
    }

    /// The plan runs exactly once, successful or not.
    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn completed(&self) -> bool {
        self.completed
    }
}
