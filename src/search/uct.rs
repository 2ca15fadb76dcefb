//! UCT over the join-order tree. Each sampling round descends from the root,
//! expands at most one node, completes the order with a random playout, and
//! backs the reward up along the visited path.

use crate::config::JoinConfig;
use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use crate::query::JoinQuery;
use crate::search::node::{evaluate_order, random_offset, NodeId, SearchNode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

pub struct UctTree {
    query: Rc<JoinQuery>,
    config: Rc<JoinConfig>,
    arena: Vec<SearchNode>,
    rng: StdRng,
}

impl UctTree {
    pub fn new(query: Rc<JoinQuery>, config: Rc<JoinConfig>) -> Self {
        let root = SearchNode::root(0, &query);
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        Self {
            query,
            config,
            arena: vec![root],
            rng,
        }
    }

    /// One sampling round: pick an order, run it for `timeout_ms`, back up
    /// the reward. Returns the reward.
    pub fn sample<E: ExecEngine>(
        &mut self,
        round: u64,
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<f64> {
        let mut order = vec![0; self.query.table_count()];
        self.sample_node(0, round, &mut order, executor, timeout_ms)
    }

    fn sample_node<E: ExecEngine>(
        &mut self,
        id: NodeId,
        round: u64,
        order: &mut [usize],
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<f64> {
        if self.arena[id].action_count == 0 {
            return evaluate_order(order, executor, timeout_ms, self.config.reward_model);
        }
        let action = self.select_action(id);
        let level = self.arena[id].level;
        order[level] = self.arena[id].next_table[action];

        // At most one expansion per round, and only into nodes created in an
        // earlier round.
        if self.arena[id].children[action].is_none() && self.arena[id].created_in != round {
            let child = SearchNode::expand(
                &self.arena[id],
                round,
                order[level],
                &self.query,
                self.config.avoid_cartesian,
            );
            let child_id = self.arena.len();
            self.arena.push(child);
            self.arena[id].children[action] = Some(child_id);
        }

        let reward = match self.arena[id].children[action] {
            Some(child_id) => self.sample_node(child_id, round, order, executor, timeout_ms)?,
            None => {
                let node = &self.arena[id];
                node.complete_order_random(order, &self.query, self.config.avoid_cartesian, &mut self.rng);
                evaluate_order(order, executor, timeout_ms, self.config.reward_model)?
            }
        };
        self.arena[id].update(action, reward);
        Ok(reward)
    }

    /// Untried actions first, uniformly; then the UCB1 maximizer over the
    /// recommended actions, scanned from a random offset so ties break
    /// uniformly.
    fn select_action(&mut self, id: NodeId) -> usize {
        if !self.arena[id].untried.is_empty() {
            let pos = random_offset(&mut self.rng, self.arena[id].untried.len());
            return self.arena[id].untried.swap_remove(pos);
        }
        let node = &self.arena[id];
        let offset = random_offset(&mut self.rng, node.action_count);
        let mut best = None;
        let mut best_bound = f64::NEG_INFINITY;
        for step in 0..node.action_count {
            let action = (offset + step) % node.action_count;
            if !node.recommended[action] {
                continue;
            }
            let exploration =
                ((node.visits as f64).ln() / node.tries[action] as f64).sqrt();
            let bound = node.mean_reward(action) + self.config.exploration * exploration;
            if bound > best_bound {
                best = Some(action);
                best_bound = bound;
            }
        }
        best.unwrap_or(offset)
    }

    /// The order the tree currently believes in: most-tried action per level,
    /// randomly completed past the deepest expanded node.
    pub fn dominant_order(&mut self) -> Vec<usize> {
        let mut order = vec![0; self.query.table_count()];
        let mut id: NodeId = 0;
        loop {
            let node = &self.arena[id];
            if node.action_count == 0 {
                break;
            }
            let action = (0..node.action_count)
                .max_by_key(|a| node.tries[*a])
                .unwrap_or(0);
            order[node.level] = node.next_table[action];
            match node.children[action] {
                Some(child_id) => id = child_id,
                None => {
                    node.complete_order_random(
                        &mut order,
                        &self.query,
                        self.config.avoid_cartesian,
                        &mut self.rng,
                    );
                    break;
                }
            }
        }
        order
    }
}
