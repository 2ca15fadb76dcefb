//! Batched execution of join fragments against the external engine. The
//! executor owns the per-table todo sets and staging tables; search policies
//! drive it one join order at a time.

use crate::bitmap::{BatchId, BatchSet};
use crate::config::{naming, JoinConfig};
use crate::engine::ExecEngine;
use crate::error::{EngineError, EngineResult};
use crate::query::JoinQuery;
use crate::stats::RunStats;
use itertools::Itertools;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;
use std::time::Instant;

pub struct BatchedExecutor<E: ExecEngine> {
    engine: E,
    query: Rc<JoinQuery>,
    config: Rc<JoinConfig>,
    /// Select list shared by all join fragments.
    select_sql: String,
    /// Conjunction of all cross-table predicates.
    where_sql: String,
    result_table: String,
    /// Staging table per source, holding the currently picked batches.
    batch_tables: Vec<String>,
    /// Unprocessed batch ids per source.
    todo: Vec<BatchSet>,
    /// Batches currently staged per source.
    current: Vec<Vec<BatchId>>,
    /// Progress-based reward scaling per source, updated on success.
    reward_scaling: Vec<f64>,
    hard_timeout: bool,
    finished: bool,
    stats: RunStats,
    rng: StdRng,
}

impl<E: ExecEngine> BatchedExecutor<E> {
    pub fn new(
        mut engine: E,
        query: Rc<JoinQuery>,
        config: Rc<JoinConfig>,
        result_table: String,
    ) -> EngineResult<Self> {
        let select_sql = create_select_sql(&query, &config);
        let where_sql = query.join_predicates.iter().join(" AND ");
        let batch_tables: Vec<_> = query
            .sources
            .iter()
            .map(|source| naming::batch_table(&source.alias))
            .collect();

        for (source, batch_table) in query.sources.iter().zip(&batch_tables) {
            engine.execute(&format!("DROP TABLE IF EXISTS {};", batch_table))?;
            engine.execute(&create_batch_table_sql(batch_table, source, &config))?;
        }
        engine.execute(&format!("DROP TABLE IF EXISTS {};", result_table))?;
        engine.execute(&create_result_table_sql(&result_table, &query, &config))?;
        engine.set_join_reordering(false)?;
        engine.set_batch_mode(true)?;

        let todo: Vec<BatchSet> = query
            .sources
            .iter()
            .map(|source| match &source.todo_batches {
                Some(batches) => batches.iter().copied().collect(),
                None => (0..config.batch_count).collect(),
            })
            .collect();
        info!(
            "batched executor over [{}], {} batches per table",
            query.sources.iter().map(|s| &s.alias).join(", "),
            config.batch_count
        );

        let table_count = query.table_count();
        let mut executor = Self {
            engine,
            select_sql,
            where_sql,
            result_table,
            batch_tables,
            todo,
            current: vec![Vec::new(); table_count],
            reward_scaling: vec![1.0; table_count],
            hard_timeout: config.hard_timeout,
            finished: false,
            stats: RunStats::default(),
            rng: StdRng::seed_from_u64(config.seed),
            query,
            config,
        };
        for table in 0..table_count {
            executor.pick_batches(table, executor.config.default_load_count);
            executor.fill_staged(table)?;
        }
        Ok(executor)
    }

    /// Runs the join fragment for `order` under `timeout_ms`, finalizing the
    /// leading table's staged batches on success. Successful attempts are
    /// greedily repeated with scaled-up batch loads and timeouts while they
    /// stay cheap. Returns whether the first attempt succeeded.
    pub fn execute(&mut self, order: &[usize], timeout_ms: u64) -> EngineResult<bool> {
        let first = order[0];
        if self.todo[first].is_empty() {
            self.mark_finished();
            return Ok(true);
        }
        let sql = self.fragment_sql(order);

        let mut first_success = false;
        let mut timeout_factor = 1.0;
        let mut batches_per_try = self.config.default_load_count;
        for round in 1..=self.config.max_greedy_executions {
            let updated_timeout = (timeout_ms as f64 * timeout_factor).round() as u64;
            let started = Instant::now();
            let success = if self.hard_timeout {
                self.engine.execute_or_timeout(&sql, updated_timeout)?
            } else {
                self.engine.set_unbounded()?;
                self.engine.execute(&sql)?;
                true
            };
            let elapsed = started.elapsed().as_millis() as u64;
            if self.hard_timeout {
                first_success |= success;
            } else if round == 1 {
                first_success = elapsed <= updated_timeout;
            }
            self.stats.record_attempt(updated_timeout, success);

            if !success {
                // A fresh pick gives slow orders a different batch to chew on
                // next time, at the cost of re-staging.
                if batches_per_try > self.config.default_load_count
                    || self.rng.gen_bool(self.config.batch_reload_probability)
                {
                    self.pick_batches(first, self.config.default_load_count);
                    self.fill_staged(first)?;
                }
                return Ok(first_success);
            }

            self.update_reward_scaling();
            self.finalize_current(first)?;
            self.stats.progress_updates += 1;
            if self.stats.progress_updates % self.config.log_progress_every == 0 {
                self.log_progress();
            }
            if self.todo[first].is_empty() {
                self.mark_finished();
                return Ok(first_success);
            }
            self.pick_batches(first, batches_per_try);
            self.fill_staged(first)?;
            if self.todo[first].is_empty() {
                self.mark_finished();
                return Ok(first_success);
            }

            if updated_timeout > self.config.greedy_timeout_ceiling_ms {
                break;
            }
            batches_per_try = (batches_per_try * self.config.greedy_batch_scale_up)
                .min(self.config.greedy_max_batches);
            timeout_factor =
                (timeout_factor * self.config.greedy_time_scale_up).min(self.config.greedy_max_time_factor);
        }
        Ok(first_success)
    }

    /// All batches of every table processed.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Draining any one table covers the whole join, so the remaining todo
    /// sets are moot once that happens.
    fn mark_finished(&mut self) {
        self.finished = true;
        for todo in &mut self.todo {
            todo.clear();
        }
        for current in &mut self.current {
            current.clear();
        }
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn result_table(&self) -> &str {
        &self.result_table
    }

    pub fn result_column_names(&self) -> Vec<String> {
        self.query
            .result_columns
            .iter()
            .map(|col| col.output_name())
            .collect()
    }

    pub fn reward_scaling(&self, table: usize) -> f64 {
        self.reward_scaling[table]
    }

    pub fn todo_remaining(&self, table: usize) -> u64 {
        self.todo[table].len()
    }

    /// Switches failed-attempt detection from engine timeouts to wall-clock
    /// checks against the nominal timeout.
    pub fn soften_timeout(&mut self) {
        self.hard_timeout = false;
    }

    /// The query as one engine-optimized insert into the result table, used
    /// when join ordering is delegated entirely to the engine.
    pub fn traditional_sql(&self) -> String {
        let from = self
            .query
            .sources
            .iter()
            .map(|source| format!("{} AS {}", source.resolved_table(), source.alias))
            .join(" CROSS JOIN ");
        let predicates = self
            .query
            .join_predicates
            .iter()
            .cloned()
            .chain(self.query.sources.iter().filter_map(|s| s.unary_pred.clone()))
            .join(" AND ");
        let mut sql = format!("INSERT INTO {} (SELECT {} FROM {}", self.result_table, self.select_sql, from);
        if !predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", predicates));
        }
        sql.push_str(");");
        sql
    }

    /// Insert statement joining the leading table's staged batches against
    /// the remaining tables in the given order.
    fn fragment_sql(&self, order: &[usize]) -> String {
        let first = order[0];
        let first_source = &self.query.sources[first];
        let leading = if self.config.materialize_batches {
            self.batch_tables[first].as_str()
        } else {
            first_source.resolved_table()
        };
        let from = std::iter::once(format!("{} AS {}", leading, first_source.alias))
            .chain(order[1..].iter().map(|idx| {
                let source = &self.query.sources[*idx];
                format!("{} AS {}", source.resolved_table(), source.alias)
            }))
            .join(" CROSS JOIN ");

        let mut predicates = Vec::new();
        if !self.where_sql.is_empty() {
            predicates.push(self.where_sql.clone());
        }
        for idx in &order[1..] {
            if let Some(pred) = &self.query.sources[*idx].unary_pred {
                predicates.push(pred.clone());
            }
        }
        if !self.config.materialize_batches {
            if let Some(pred) = &first_source.unary_pred {
                predicates.push(pred.clone());
            }
            predicates.push(batch_pred(&first_source.alias, &self.current[first]));
        }

        let mut sql = format!(
            "INSERT INTO {} (SELECT {} FROM {}",
            self.result_table, self.select_sql, from
        );
        if !predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", predicates.iter().join(" AND ")));
        }
        sql.push_str(");");
        sql
    }

    /// Picks `requested` distinct batches uniformly from the todo set.
    fn pick_batches(&mut self, table: usize, requested: u32) {
        let available = self.todo[table].len() as u32;
        let count = requested.min(available);
        let mut picked: Vec<BatchId> = Vec::with_capacity(count as usize);
        while (picked.len() as u32) < count {
            let pos = self.rng.gen_range(0..available);
            let batch = self.todo[table]
                .select(pos)
                .expect("position within todo set");
            if !picked.contains(&batch) {
                picked.push(batch);
            }
        }
        self.current[table] = picked;
    }

    /// Re-stages the picked batches until the staging table is non-empty.
    /// After a bounded number of empty picks, searches the engine for any
    /// non-empty batch; if none exists the table's todo set is cleared.
    fn fill_staged(&mut self, table: usize) -> EngineResult<()> {
        let mut attempts = 0;
        while self.materialize_staged(table)? == 0 && !self.todo[table].is_empty() {
            self.finalize_current(table)?;
            self.pick_batches(table, self.config.default_load_count);
            attempts += 1;
            if attempts >= self.config.staging_probe_threshold {
                match self.find_non_empty_batch(table)? {
                    Some(batch) => self.current[table] = vec![batch],
                    None => {
                        self.todo[table].clear();
                        self.current[table].clear();
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Copies the currently picked batches into the staging table and returns
    /// the staged row count. When staging is disabled the fragment restricts
    /// by batch id directly and the picked batches count as staged.
    fn materialize_staged(&mut self, table: usize) -> EngineResult<u64> {
        if !self.config.materialize_batches {
            return Ok(self.current[table].len() as u64);
        }
        self.engine.set_unbounded()?;
        let source = &self.query.sources[table];
        let resolved = source.resolved_table();
        let threshold = self.config.batch_index_threshold;
        if threshold < 1.0
            && (self.todo[table].len() as f64) < self.config.batch_count as f64 * threshold
        {
            self.engine.execute(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                naming::batch_index(resolved),
                resolved,
                naming::BATCH_ID_COLUMN
            ))?;
        }
        self.engine
            .execute(&format!("TRUNCATE {};", self.batch_tables[table]))?;
        if self.current[table].is_empty() {
            return Ok(0);
        }
        let mut columns: Vec<String> = source
            .columns
            .iter()
            .map(|col| format!("{}.{}", source.alias, col.name))
            .collect();
        if !self.config.delete_processed {
            columns.push(format!("{}.{}", source.alias, naming::BATCH_ID_COLUMN));
        }
        let sql = format!(
            "INSERT INTO {} (SELECT {} FROM {} AS {} WHERE {}{});",
            self.batch_tables[table],
            columns.iter().join(", "),
            resolved,
            source.alias,
            batch_pred(&source.alias, &self.current[table]),
            match &source.unary_pred {
                Some(pred) => format!(" AND {}", pred),
                None => String::new(),
            }
        );
        self.engine.execute(&sql)
    }

    /// Asks the engine for any todo batch that still has qualifying rows.
    fn find_non_empty_batch(&mut self, table: usize) -> EngineResult<Option<BatchId>> {
        let source = &self.query.sources[table];
        let ids = self.todo[table].iter().join(", ");
        let sql = format!(
            "SELECT {}.{} FROM {} AS {} WHERE {}.{} IN ({}){} LIMIT 1;",
            source.alias,
            naming::BATCH_ID_COLUMN,
            source.resolved_table(),
            source.alias,
            source.alias,
            naming::BATCH_ID_COLUMN,
            ids,
            match &source.unary_pred {
                Some(pred) => format!(" AND {}", pred),
                None => String::new(),
            }
        );
        let rows = self.engine.query(&sql)?;
        match rows.first().and_then(|row| row.first()) {
            Some(value) => {
                let batch = value.parse::<BatchId>().map_err(|err| {
                    EngineError::Execution(format!("bad batch id {:?}: {}", value, err))
                })?;
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    /// Marks the staged batches processed. With `delete_processed` the rows
    /// are also removed from the source table.
    fn finalize_current(&mut self, table: usize) -> EngineResult<()> {
        if self.current[table].is_empty() {
            return Ok(());
        }
        if self.config.delete_processed {
            let resolved = self.query.sources[table].resolved_table();
            self.engine.execute(&format!(
                "DELETE FROM {} WHERE {};",
                resolved,
                batch_pred(resolved, &self.current[table])
            ))?;
        }
        for batch in self.current[table].drain(..) {
            self.todo[table].remove(batch);
        }
        Ok(())
    }

    /// Rescales per-table rewards so leading with a nearly-finished table is
    /// not overvalued relative to tables with most batches left.
    fn update_reward_scaling(&mut self) {
        let remaining: Vec<u64> = self.todo.iter().map(|todo| todo.len()).collect();
        let min_remaining = remaining.iter().copied().min().unwrap_or(0);
        for (table, count) in remaining.iter().enumerate() {
            self.reward_scaling[table] = if *count == 0 {
                1.0
            } else {
                min_remaining as f64 / *count as f64
            };
        }
    }

    fn log_progress(&self) {
        debug!(
            "remaining batches: {}",
            self.query
                .sources
                .iter()
                .zip(&self.todo)
                .map(|(source, todo)| format!("{}={}", source.alias, todo.len()))
                .join(" ")
        );
    }
}

fn batch_pred(qualifier: &str, batches: &[BatchId]) -> String {
    format!(
        "{}.{} IN ({})",
        qualifier,
        naming::BATCH_ID_COLUMN,
        batches.iter().join(", ")
    )
}

fn create_select_sql(query: &JoinQuery, config: &JoinConfig) -> String {
    let mut items = Vec::new();
    if !config.delete_processed {
        for source in &query.sources {
            items.push(format!("{}.{}", source.alias, naming::BATCH_ID_COLUMN));
        }
    }
    for col in &query.result_columns {
        items.push(col.qualified());
    }
    items.iter().join(", ")
}

fn create_batch_table_sql(batch_table: &str, source: &crate::query::TableSource, config: &JoinConfig) -> String {
    let mut columns: Vec<String> = source
        .columns
        .iter()
        .map(|col| format!("{} {}", col.name, col.sql_type))
        .collect();
    if !config.delete_processed {
        columns.push(format!("{} INT", naming::BATCH_ID_COLUMN));
    }
    format!(
        "CREATE TEMP TABLE {} ({});",
        batch_table,
        columns.iter().join(", ")
    )
}

fn create_result_table_sql(result_table: &str, query: &JoinQuery, config: &JoinConfig) -> String {
    let mut columns = Vec::new();
    if !config.delete_processed {
        for source in &query.sources {
            columns.push(format!(
                "{}_{} INT",
                source.alias,
                naming::BATCH_ID_COLUMN
            ));
        }
    }
    for col in &query.result_columns {
        columns.push(format!("{} {}", col.output_name(), col.sql_type));
    }
    format!(
        "CREATE TEMP TABLE {} ({});",
        result_table,
        columns.iter().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{chain_query, SimBehavior, SimEngine};
    use pretty_assertions::assert_eq;

    fn executor_with(
        behavior: SimBehavior,
        tables: usize,
        batches: u32,
        config: JoinConfig,
    ) -> BatchedExecutor<SimEngine> {
        let query = Rc::new(chain_query(tables, batches));
        let config = Rc::new(config.with_batch_count(batches));
        BatchedExecutor::new(
            SimEngine::new(behavior),
            query,
            config,
            "rljjoinedq1".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_setup_creates_staging_and_result_tables() {
        let executor = executor_with(SimBehavior::Succeed, 2, 4, JoinConfig::default());
        let log = executor.engine.log.join("\n");
        assert!(log.contains("CREATE TEMP TABLE t0nextbatch (k INT, rljbatchid INT);"));
        assert!(log.contains("CREATE TEMP TABLE t1nextbatch (k INT, rljbatchid INT);"));
        assert!(log.contains(
            "CREATE TEMP TABLE rljjoinedq1 (t0_rljbatchid INT, t1_rljbatchid INT, t0_k INT, t1_k INT);"
        ));
        assert!(log.contains("SET join_reordering off"));
        assert!(log.contains("SET batch_mode on"));
    }

    #[test]
    fn test_execute_runs_under_timeout_and_resets() {
        let mut executor = executor_with(SimBehavior::Succeed, 2, 4, JoinConfig::default());
        executor.engine.log.clear();
        executor.execute(&[0, 1], 20).unwrap();
        let log = &executor.engine.log;
        let insert_pos = log
            .iter()
            .position(|stmt| stmt.starts_with("INSERT INTO rljjoinedq1"))
            .unwrap();
        assert_eq!(log[insert_pos - 1], "SET timeout 20");
        assert_eq!(log[insert_pos + 1], "SET unbounded");
    }

    #[test]
    fn test_fragment_joins_staged_leader_against_full_tables() {
        let mut executor = executor_with(SimBehavior::Succeed, 3, 4, JoinConfig::default());
        executor.engine.log.clear();
        executor.execute(&[1, 2, 0], 20).unwrap();
        let fragment = executor
            .engine
            .log
            .iter()
            .find(|stmt| stmt.starts_with("INSERT INTO rljjoinedq1"))
            .unwrap();
        assert!(fragment
            .contains("FROM t1nextbatch AS t1 CROSS JOIN tab2 AS t2 CROSS JOIN tab0 AS t0"));
        assert!(fragment.contains("WHERE t0.k = t1.k AND t1.k = t2.k"));
        assert!(fragment.contains("t0.rljbatchid, t1.rljbatchid, t2.rljbatchid"));
    }

    #[test]
    fn test_successful_attempts_drain_the_leading_table() {
        let mut executor = executor_with(SimBehavior::Succeed, 2, 3, JoinConfig::default());
        let mut remaining = executor.todo_remaining(0);
        assert_eq!(remaining, 3);
        while !executor.finished() {
            assert!(executor.execute(&[0, 1], 20).unwrap());
            let now = executor.todo_remaining(0);
            assert!(now < remaining || executor.finished());
            remaining = now;
        }
        // Draining one table covers the join; every todo set reads empty.
        assert_eq!(executor.todo_remaining(0), 0);
        assert_eq!(executor.todo_remaining(1), 0);
    }

    #[test]
    fn test_failed_attempt_leaves_todo_untouched() {
        let mut config = JoinConfig::default();
        config.batch_reload_probability = 0.0;
        let mut executor = executor_with(SimBehavior::Timeout, 2, 4, config);
        executor.engine.log.clear();
        assert!(!executor.execute(&[0, 1], 20).unwrap());
        assert_eq!(executor.todo_remaining(0), 4);
        assert!(!executor.finished());
        // No re-staging without the reload coin flip.
        assert!(!executor.engine.log.iter().any(|s| s.starts_with("TRUNCATE")));
    }

    #[test]
    fn test_failed_attempt_reloads_batches_when_configured() {
        let mut config = JoinConfig::default();
        config.batch_reload_probability = 1.0;
        let mut executor = executor_with(SimBehavior::Timeout, 2, 4, config);
        executor.engine.log.clear();
        assert!(!executor.execute(&[0, 1], 20).unwrap());
        assert_eq!(executor.todo_remaining(0), 4);
        assert!(executor
            .engine
            .log
            .iter()
            .any(|s| s.starts_with("TRUNCATE t0nextbatch")));
    }

    #[test]
    fn test_empty_probe_clears_todo() {
        let query = Rc::new(chain_query(2, 4));
        let config = Rc::new(JoinConfig::default().with_batch_count(4));
        let mut engine = SimEngine::new(SimBehavior::Succeed);
        engine.empty_stagings = u64::MAX;
        engine.probe_batch = None;
        let mut executor =
            BatchedExecutor::new(engine, query, config, "rljjoinedq1".to_string()).unwrap();
        assert_eq!(executor.todo_remaining(0), 0);
        assert_eq!(executor.todo_remaining(1), 0);
        assert!(executor.execute(&[0, 1], 20).unwrap());
        assert!(executor.finished());
    }

    #[test]
    fn test_probe_recovers_a_non_empty_batch() {
        let query = Rc::new(chain_query(2, 8));
        let config = Rc::new(JoinConfig::default().with_batch_count(8));
        let mut engine = SimEngine::new(SimBehavior::Succeed);
        // Force probing for the first table, then stage normally.
        engine.empty_stagings = JoinConfig::default().staging_probe_threshold as u64 + 1;
        engine.probe_batch = Some(5);
        let executor =
            BatchedExecutor::new(engine, query, config, "rljjoinedq1".to_string()).unwrap();
        assert!(executor.todo_remaining(0) > 0);
        assert!(executor
            .engine
            .log
            .iter()
            .any(|s| s.starts_with("SELECT t0.rljbatchid") && s.ends_with("LIMIT 1;")));
    }

    #[test]
    fn test_reward_scaling_tracks_relative_progress() {
        let mut executor = executor_with(SimBehavior::Succeed, 2, 4, JoinConfig::default());
        assert!(executor.execute(&[0, 1], 20).unwrap());
        assert!(executor.execute(&[0, 1], 20).unwrap());
        // Second run saw 3 of 4 batches left on t0 and all 4 on t1.
        assert_eq!(executor.reward_scaling(0), 1.0);
        assert_eq!(executor.reward_scaling(1), 0.75);
    }

    #[test]
    fn test_fatal_engine_error_propagates() {
        let mut executor = executor_with(
            SimBehavior::FailJoins("disk full".to_string()),
            2,
            4,
            JoinConfig::default(),
        );
        let err = executor.execute(&[0, 1], 20).unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
    }

    #[test]
    fn test_soft_timeout_runs_unbounded() {
        let mut executor = executor_with(SimBehavior::Succeed, 2, 4, JoinConfig::default());
        executor.soften_timeout();
        executor.engine.log.clear();
        assert!(executor.execute(&[0, 1], 20).unwrap());
        assert!(!executor.engine.log.iter().any(|s| s.starts_with("SET timeout")));
    }

    #[test]
    fn test_unmaterialized_fragment_restricts_by_batch_id() {
        let mut config = JoinConfig::default();
        config.materialize_batches = false;
        let mut executor = executor_with(SimBehavior::Succeed, 2, 4, config);
        executor.engine.log.clear();
        assert!(executor.execute(&[0, 1], 20).unwrap());
        let fragment = executor
            .engine
            .log
            .iter()
            .find(|stmt| stmt.starts_with("INSERT INTO rljjoinedq1"))
            .unwrap();
        assert!(fragment.contains("FROM tab0 AS t0 CROSS JOIN tab1 AS t1"));
        assert!(fragment.contains("AND t0.rljbatchid IN ("));
        assert!(!executor.engine.log.iter().any(|s| s.starts_with("TRUNCATE")));
    }

    #[test]
    fn test_greedy_repeats_until_the_timeout_ceiling() {
        let mut config = JoinConfig::default();
        config.max_greedy_executions = 3;
        config.batch_reload_probability = 0.0;
        let mut executor = executor_with(SimBehavior::Succeed, 2, 100, config);
        assert!(executor.execute(&[0, 1], 20).unwrap());
        // One attempt at the base timeout, one more at the scaled timeout that
        // already sits past the ceiling, then stop.
        assert_eq!(executor.stats().attempts(20), 1);
        assert_eq!(executor.stats().attempts(100), 1);
    }

    #[test]
    fn test_delete_processed_removes_source_rows() {
        let mut config = JoinConfig::default();
        config.delete_processed = true;
        let mut executor = executor_with(SimBehavior::Succeed, 2, 4, config);
        executor.engine.log.clear();
        assert!(executor.execute(&[0, 1], 20).unwrap());
        assert!(executor
            .engine
            .log
            .iter()
            .any(|s| s.starts_with("DELETE FROM tab0 WHERE tab0.rljbatchid IN")));
    }
}
