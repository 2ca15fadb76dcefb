mod brue;
mod delegate;
mod node;
mod uct;

pub use brue::{BrueTree, SampleOutcome};
pub use delegate::DelegateSearch;
pub use uct::UctTree;

use crate::config::{JoinConfig, LearningPolicy};
use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use crate::query::JoinQuery;
use std::rc::Rc;

/// Join-order search policy, dispatched by configuration.
pub enum SearchTree {
    Uct(UctTree),
    Brue(BrueTree),
    Delegate(DelegateSearch),
}

impl SearchTree {
    pub fn new<E: ExecEngine>(
        query: Rc<JoinQuery>,
        config: Rc<JoinConfig>,
        executor: &BatchedExecutor<E>,
    ) -> Self {
        match config.policy {
            LearningPolicy::Uct => SearchTree::Uct(UctTree::new(query, config)),
            LearningPolicy::Brue => SearchTree::Brue(BrueTree::new(query, config)),
            LearningPolicy::EngineOpt => {
                let table_count = query.table_count();
                SearchTree::Delegate(DelegateSearch::new(executor, table_count, &config))
            }
        }
    }

    pub fn sample<E: ExecEngine>(
        &mut self,
        round: u64,
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<f64> {
        match self {
            SearchTree::Uct(tree) => tree.sample(round, executor, timeout_ms),
            SearchTree::Brue(tree) => tree.sample(round, executor, timeout_ms),
            SearchTree::Delegate(search) => search.sample(executor),
        }
    }

    pub fn dominant_order(&mut self) -> Vec<usize> {
        match self {
            SearchTree::Uct(tree) => tree.dominant_order(),
            SearchTree::Brue(tree) => tree.dominant_order(),
            SearchTree::Delegate(search) => search.dominant_order(),
        }
    }

    /// Whether the policy already produced the complete result on its own.
    /// Only the delegating policy ever does.
    pub fn completed(&self) -> bool {
        match self {
            SearchTree::Uct(_) | SearchTree::Brue(_) => false,
            SearchTree::Delegate(search) => search.completed(),
        }
    }

    /// Whether further sampling cannot help. The learning policies always
    /// have more orders to try; the delegating policy runs its plan once.
    pub fn exhausted(&self) -> bool {
        match self {
            SearchTree::Uct(_) | SearchTree::Brue(_) => false,
            SearchTree::Delegate(search) => search.attempted(),
        }
    }
}
