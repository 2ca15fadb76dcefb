//! Utility module useful for testing and simulation. `SimEngine` stands in
//! for the external engine: it classifies statements by the tables they
//! touch, answers with scripted outcomes, and keeps a statement log so tests
//! can assert on sequencing.

use crate::bitmap::BatchId;
use crate::config::naming;
use crate::engine::ExecEngine;
use crate::error::{EngineError, EngineResult};
use crate::query::{ColumnDef, JoinQuery, ResultColumn, TableSource};
use itertools::Itertools;
use std::collections::BTreeSet;

/// How join attempts (inserts into the join result table) behave.
#[derive(Debug, Clone)]
pub enum SimBehavior {
    Succeed,
    Timeout,
    /// Fail with a non-timeout engine error.
    FailJoins(String),
    /// Succeed only when the fragment's leading table belongs to one of
    /// these aliases; time out otherwise.
    SucceedWhenLeading(Vec<String>),
}

impl SimBehavior {
    pub fn succeed_when_leading(alias: &str) -> Self {
        SimBehavior::SucceedWhenLeading(vec![alias.to_string()])
    }
}

pub struct SimEngine {
    pub behavior: SimBehavior,
    /// Every statement and session change, in order.
    pub log: Vec<String>,
    /// Rows reported for each staging insert once the scripted empties run
    /// out.
    pub staged_rows: u64,
    /// This many staging inserts report zero rows before `staged_rows` kicks
    /// in.
    pub empty_stagings: u64,
    /// Answer to non-empty-batch probes.
    pub probe_batch: Option<BatchId>,
    /// This many final-result creations time out before succeeding.
    pub failing_creates: u64,
    pub timeout_ms: Option<u64>,
}

impl SimEngine {
    pub fn new(behavior: SimBehavior) -> Self {
        Self {
            behavior,
            log: Vec::new(),
            staged_rows: 10,
            empty_stagings: 0,
            probe_batch: Some(0),
            failing_creates: 0,
            timeout_ms: None,
        }
    }

    fn join_attempt(&mut self, sql: &str) -> EngineResult<u64> {
        match &self.behavior {
            SimBehavior::Succeed => Ok(1),
            SimBehavior::Timeout => Err(EngineError::Timeout),
            SimBehavior::FailJoins(message) => Err(EngineError::Execution(message.clone())),
            SimBehavior::SucceedWhenLeading(aliases) => {
                let leading = leading_table(sql);
                if aliases.iter().any(|alias| leading.starts_with(alias.as_str())) {
                    Ok(1)
                } else {
                    Err(EngineError::Timeout)
                }
            }
        }
    }
}

/// First table reference of a fragment's FROM clause.
fn leading_table(sql: &str) -> &str {
    sql.split(" FROM ")
        .nth(1)
        .and_then(|rest| rest.split(" AS ").next())
        .unwrap_or("")
}

impl ExecEngine for SimEngine {
    fn execute(&mut self, sql: &str) -> EngineResult<u64> {
        self.log.push(sql.to_string());
        if sql.starts_with(&format!("INSERT INTO {}", naming::JOIN_TABLE_PREFIX)) {
            return self.join_attempt(sql);
        }
        if sql.starts_with(&format!("CREATE TEMP TABLE {}", naming::FINAL_TABLE_PREFIX))
            && sql.contains(" AS (")
        {
            if self.failing_creates > 0 {
                self.failing_creates -= 1;
                return Err(EngineError::Timeout);
            }
            return Ok(0);
        }
        if sql.starts_with("INSERT INTO ") {
            // Staging insert into a per-table batch table.
            if self.empty_stagings > 0 {
                self.empty_stagings -= 1;
                return Ok(0);
            }
            return Ok(self.staged_rows);
        }
        Ok(0)
    }

    fn query(&mut self, sql: &str) -> EngineResult<Vec<Vec<String>>> {
        self.log.push(sql.to_string());
        if sql.ends_with("LIMIT 1;") {
            return Ok(self
                .probe_batch
                .map(|batch| vec![vec![batch.to_string()]])
                .unwrap_or_default());
        }
        Ok(Vec::new())
    }

    fn set_timeout(&mut self, millis: u64) -> EngineResult<()> {
        self.timeout_ms = Some(millis);
        self.log.push(format!("SET timeout {}", millis));
        Ok(())
    }

    fn set_unbounded(&mut self) -> EngineResult<()> {
        self.timeout_ms = None;
        self.log.push("SET unbounded".to_string());
        Ok(())
    }

    fn set_join_reordering(&mut self, enabled: bool) -> EngineResult<()> {
        self.log
            .push(format!("SET join_reordering {}", if enabled { "on" } else { "off" }));
        Ok(())
    }

    fn set_batch_mode(&mut self, enabled: bool) -> EngineResult<()> {
        self.log
            .push(format!("SET batch_mode {}", if enabled { "on" } else { "off" }));
        Ok(())
    }
}

/// A chain join over `tables` tables: `tab0 AS t0` through `tab{n-1}`, linked
/// by equality on column `k`, with each table's todo set spanning `batches`
/// batches.
pub fn chain_query(tables: usize, batches: u32) -> JoinQuery {
    let sources = (0..tables)
        .map(|idx| TableSource {
            alias: format!("t{}", idx),
            table: format!("tab{}", idx),
            filtered_table: None,
            columns: vec![ColumnDef {
                name: "k".to_string(),
                sql_type: "INT".to_string(),
            }],
            unary_pred: None,
            todo_batches: Some((0..batches).collect()),
        })
        .collect();
    let join_predicates: Vec<String> = (0..tables.saturating_sub(1))
        .map(|idx| format!("t{}.k = t{}.k", idx, idx + 1))
        .collect();
    let link_sets = (0..tables.saturating_sub(1))
        .map(|idx| BTreeSet::from([idx, idx + 1]))
        .collect();
    JoinQuery {
        join_predicates: join_predicates.clone(),
        where_predicates: join_predicates,
        result_columns: (0..tables)
            .map(|idx| ResultColumn {
                alias: format!("t{}", idx),
                column: "k".to_string(),
                sql_type: "INT".to_string(),
            })
            .collect(),
        select_clause: (0..tables).map(|idx| format!("t{}.k", idx)).join(", "),
        group_by: Vec::new(),
        having: None,
        order_by: Vec::new(),
        link_sets,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_probe_answers_follow_the_scripted_batch() {
        let mut engine = SimEngine::new(SimBehavior::Succeed);
        engine.probe_batch = Some(7);
        let rows = engine
            .query("SELECT t0.rljbatchid FROM tab0 AS t0 WHERE t0.rljbatchid IN (7) LIMIT 1;")
            .unwrap();
        assert_eq!(rows, vec![vec!["7".to_string()]]);

        engine.probe_batch = None;
        let rows = engine
            .query("SELECT t0.rljbatchid FROM tab0 AS t0 WHERE t0.rljbatchid IN (7) LIMIT 1;")
            .unwrap();
        assert!(rows.is_empty());
    }
}
