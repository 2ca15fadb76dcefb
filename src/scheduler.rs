//! Drives sampling rounds against the executor and decides when to give up
//! on batched execution and hand the dominant order to the engine whole.

use crate::config::{naming, JoinConfig};
use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use crate::query::{JoinQuery, JoinSummary};
use crate::search::SearchTree;
use crate::stats::RunStats;
use log::{debug, info};
use std::rc::Rc;
use std::time::Instant;

/// Per-round timeout schedule. Level timeouts grow geometrically; a level is
/// only granted once every smaller level has accumulated at least as much
/// time as the grant would bring this level to. Roughly half of all time goes
/// to the smallest timeout, a quarter to the next, and so on.
pub struct TimeoutPyramid {
    timeouts: Vec<u64>,
    accumulated: Vec<u64>,
}

impl TimeoutPyramid {
    pub fn new(base_ms: u64, scale_up: f64, levels: usize) -> Self {
        let timeouts = (0..levels)
            .map(|level| (base_ms as f64 * scale_up.powi(level as i32)).round() as u64)
            .collect();
        Self {
            timeouts,
            accumulated: vec![0; levels],
        }
    }

    /// Grants the deepest affordable level, charges its timeout against it,
    /// and returns the level.
    pub fn next_level(&mut self) -> usize {
        for level in (0..self.timeouts.len()).rev() {
            let affordable = (0..level)
                .all(|small| self.accumulated[small] >= self.accumulated[level] + self.timeouts[level]);
            if affordable {
                self.accumulated[level] += self.timeouts[level];
                return level;
            }
        }
        unreachable!("the smallest level is always affordable")
    }

    pub fn timeout(&self, level: usize) -> u64 {
        self.timeouts[level]
    }

    pub fn accumulated(&self, level: usize) -> u64 {
        self.accumulated[level]
    }

    pub fn level_count(&self) -> usize {
        self.timeouts.len()
    }
}

/// Outcome of a scheduled run: where the result landed plus counters.
pub struct JoinRun {
    pub summary: JoinSummary,
    pub stats: RunStats,
}

pub struct JoinScheduler<E: ExecEngine> {
    executor: BatchedExecutor<E>,
    tree: SearchTree,
    query: Rc<JoinQuery>,
    config: Rc<JoinConfig>,
    pyramid: TimeoutPyramid,
    final_table: String,
}

impl<E: ExecEngine> JoinScheduler<E> {
    pub fn new(
        engine: E,
        query: JoinQuery,
        config: JoinConfig,
        query_id: &str,
    ) -> EngineResult<Self> {
        let query = Rc::new(query);
        let config = Rc::new(config);
        let result_table = format!("{}{}", naming::JOIN_TABLE_PREFIX, query_id);
        let final_table = format!("{}{}", naming::FINAL_TABLE_PREFIX, query_id);
        let mut executor =
            BatchedExecutor::new(engine, query.clone(), config.clone(), result_table)?;
        executor
            .engine_mut()
            .execute(&format!("DROP TABLE IF EXISTS {};", final_table))?;
        let pyramid =
            TimeoutPyramid::new(config.timeout_base_ms, config.timeout_scale_up, config.timeout_levels);
        let tree = SearchTree::new(query.clone(), config.clone(), &executor);
        Ok(Self {
            executor,
            tree,
            query,
            config,
            pyramid,
            final_table,
        })
    }

    pub fn run(mut self) -> EngineResult<JoinRun> {
        if self.config.learning_threshold_ms > 0 && self.try_without_learning()? {
            let summary = self.summary(true);
            let mut stats = self.executor.stats().clone();
            stats.used_learning = false;
            stats.finished_non_batched = true;
            return Ok(JoinRun { summary, stats });
        }
        self.executor.stats_mut().used_learning = true;

        let mut rounds_to_switch = self.config.initial_rounds_to_switch;
        let mut round: u64 = 0;
        let mut finished_non_batched = false;
        while !self.executor.finished() && !self.tree.completed() && !finished_non_batched {
            let engine = self.executor.engine_mut();
            engine.set_batch_mode(true)?;
            engine.set_join_reordering(false)?;

            let phase_start = round;
            let started = Instant::now();
            while !self.executor.finished()
                && !self.tree.completed()
                && !self.tree.exhausted()
                && round - phase_start < rounds_to_switch
            {
                round += 1;
                let level = self.pyramid.next_level();
                let timeout_ms = self.pyramid.timeout(level);
                self.tree.sample(round, &mut self.executor, timeout_ms)?;
                if round > self.config.soften_timeout_after {
                    self.executor.soften_timeout();
                }
                if round % self.config.log_dominant_every == 0 {
                    debug!("round {}: dominant order {:?}", round, self.tree.dominant_order());
                }
            }
            let batched_ms = started.elapsed().as_millis() as u64;
            self.executor.stats_mut().batched_millis += batched_ms;

            if !self.executor.finished() && !self.tree.completed() {
                finished_non_batched = self.execute_non_batched(batched_ms.max(1))?;
                if !finished_non_batched {
                    rounds_to_switch =
                        rounds_to_switch.saturating_mul(self.config.rounds_to_switch_scale_up);
                }
            }
        }

        let stats = {
            let stats = self.executor.stats_mut();
            stats.rounds = round;
            stats.finished_non_batched = finished_non_batched;
            stats.log_attempt_histogram();
            stats.clone()
        };
        let summary = self.summary(finished_non_batched);
        Ok(JoinRun { summary, stats })
    }

    /// Hybrid bypass: give the engine-optimized plan one bounded shot before
    /// spending any time on learning.
    fn try_without_learning(&mut self) -> EngineResult<bool> {
        let order: Vec<usize> = (0..self.query.table_count()).collect();
        let sql = format!(
            "CREATE TEMP TABLE {} AS ({});",
            self.final_table,
            self.query.reordered_query(&order)
        );
        let threshold = self.config.learning_threshold_ms;
        let engine = self.executor.engine_mut();
        engine.set_batch_mode(false)?;
        engine.set_join_reordering(true)?;
        let succeeded = engine.execute_or_timeout(&sql, threshold)?;
        if succeeded {
            info!("engine-optimized plan finished within {}ms, skipping learning", threshold);
        }
        Ok(succeeded)
    }

    /// Runs the dominant order as one non-batched statement. Bounded by the
    /// elapsed batched time when configured, otherwise committed without a
    /// timeout.
    fn execute_non_batched(&mut self, budget_ms: u64) -> EngineResult<bool> {
        let dominant = self.tree.dominant_order();
        info!("switching to non-batched execution with order {:?}", dominant);
        let sql = format!(
            "CREATE TEMP TABLE {} AS ({});",
            self.final_table,
            self.query.reordered_query(&dominant)
        );
        let bounded = self.config.bounded_fallback;
        let engine = self.executor.engine_mut();
        engine.set_batch_mode(false)?;
        engine.set_join_reordering(false)?;
        let started = Instant::now();
        let finished = if bounded {
            engine.execute_or_timeout(&sql, budget_ms)?
        } else {
            engine.set_unbounded()?;
            engine.execute(&sql)?;
            true
        };
        let stats = self.executor.stats_mut();
        stats.fallback_attempts += 1;
        if finished {
            stats.non_batched_millis = Some(started.elapsed().as_millis() as u64);
        }
        Ok(finished)
    }

    fn summary(&self, finished_non_batched: bool) -> JoinSummary {
        JoinSummary {
            result_table: self.executor.result_table().to_string(),
            result_columns: self.executor.result_column_names(),
            final_table: finished_non_batched.then(|| self.final_table.clone()),
        }
    }
}
