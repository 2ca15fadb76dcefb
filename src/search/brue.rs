//! BRUE over the join-order tree. Each round picks a select-switch depth:
//! levels above it explore uniformly, levels at and below it exploit the best
//! observed mean, and only the node at the switch depth is updated.
//! Nodes are shared across paths through a prefix map, so the same ordered
//! prefix is never represented twice.

use crate::config::JoinConfig;
use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use crate::query::JoinQuery;
use crate::search::node::{evaluate_order, random_offset, NodeId, SearchNode};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Result of one BRUE round. `restart` flags rounds whose expansion happened
/// away from the switch depth, which makes the backed-up estimate stale.
pub struct SampleOutcome {
    pub reward: f64,
    pub expanded: bool,
    pub restart: bool,
}

pub struct BrueTree {
    query: Rc<JoinQuery>,
    config: Rc<JoinConfig>,
    arena: Vec<SearchNode>,
    /// Ordered join prefix to its unique node.
    prefix_map: FxHashMap<Vec<usize>, NodeId>,
    rng: StdRng,
}

impl BrueTree {
    pub fn new(query: Rc<JoinQuery>, config: Rc<JoinConfig>) -> Self {
        let root = SearchNode::root(0, &query);
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(2));
        Self {
            query,
            config,
            arena: vec![root],
            prefix_map: FxHashMap::default(),
            rng,
        }
    }

    pub fn sample<E: ExecEngine>(
        &mut self,
        round: u64,
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<f64> {
        let switch = self.select_switch(round);
        let outcome = self.sample_with_switch(round, switch, executor, timeout_ms)?;
        if outcome.restart {
            debug!("round {}: expansion away from switch depth {}", round, switch);
        }
        Ok(outcome.reward)
    }

    /// Cyclic sweep of the switch depth, from the deepest decision level down
    /// to the root.
    fn select_switch(&self, round: u64) -> usize {
        let levels = self.query.table_count() as u64;
        ((levels - 1) - ((round - 1) % levels)) as usize
    }

    pub fn sample_with_switch<E: ExecEngine>(
        &mut self,
        round: u64,
        switch: usize,
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<SampleOutcome> {
        let mut order = vec![0; self.query.table_count()];
        self.sample_node(0, round, switch, true, &mut order, executor, timeout_ms)
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_node<E: ExecEngine>(
        &mut self,
        id: NodeId,
        round: u64,
        switch: usize,
        expand: bool,
        order: &mut [usize],
        executor: &mut BatchedExecutor<E>,
        timeout_ms: u64,
    ) -> EngineResult<SampleOutcome> {
        if self.arena[id].action_count == 0 {
            let reward = evaluate_order(order, executor, timeout_ms, self.config.reward_model)?;
            return Ok(SampleOutcome {
                reward,
                expanded: false,
                restart: false,
            });
        }
        let level = self.arena[id].level;
        let action = if level < switch {
            self.exploration_policy(id)
        } else {
            self.estimation_policy(id)
        };
        order[level] = self.arena[id].next_table[action];

        let outcome = match self.arena[id].children[action] {
            Some(child_id) => {
                self.sample_node(child_id, round, switch, expand, order, executor, timeout_ms)?
            }
            None => {
                let child_id = self.node_for_prefix(&order[..=level], round);
                if expand {
                    self.arena[id].children[action] = Some(child_id);
                }
                let mut outcome =
                    self.sample_node(child_id, round, switch, false, order, executor, timeout_ms)?;
                if expand {
                    outcome.expanded = true;
                    if level != switch {
                        outcome.restart = true;
                    }
                }
                outcome
            }
        };
        if level == switch {
            self.arena[id].update(action, outcome.reward);
        }
        Ok(outcome)
    }

    /// Node for an ordered join prefix, created on first use.
    fn node_for_prefix(&mut self, prefix: &[usize], round: u64) -> NodeId {
        if let Some(id) = self.prefix_map.get(prefix) {
            return *id;
        }
        let table = prefix[prefix.len() - 1];
        let parent_id = if prefix.len() == 1 {
            0
        } else {
            self.node_for_prefix(&prefix[..prefix.len() - 1], round)
        };
        let child = SearchNode::expand(
            &self.arena[parent_id],
            round,
            table,
            &self.query,
            self.config.avoid_cartesian,
        );
        let id = self.arena.len();
        self.arena.push(child);
        self.prefix_map.insert(prefix.to_vec(), id);
        id
    }

    /// Best observed mean among recommended actions, scanned from a random
    /// offset.
    fn estimation_policy(&mut self, id: NodeId) -> usize {
        let offset = random_offset(&mut self.rng, self.arena[id].action_count);
        let node = &self.arena[id];
        let mut best = None;
        let mut best_mean = -1.0;
        for step in 0..node.action_count {
            let action = (offset + step) % node.action_count;
            if !node.recommended[action] {
                continue;
            }
            let mean = node.mean_reward(action);
            if mean > best_mean {
                best = Some(action);
                best_mean = mean;
            }
        }
        best.unwrap_or(offset)
    }

    /// Uniformly random recommended action.
    fn exploration_policy(&mut self, id: NodeId) -> usize {
        let offset = random_offset(&mut self.rng, self.arena[id].action_count);
        let node = &self.arena[id];
        for step in 0..node.action_count {
            let action = (offset + step) % node.action_count;
            if node.recommended[action] {
                return action;
            }
        }
        offset
    }

    /// The order the tree currently believes in: best-mean action per level,
    /// randomly completed past the deepest linked node.
    pub fn dominant_order(&mut self) -> Vec<usize> {
        let mut order = vec![0; self.query.table_count()];
        let mut id: NodeId = 0;
        loop {
            let node = &self.arena[id];
            if node.action_count == 0 {
                break;
            }
            let action = (0..node.action_count)
                .filter(|a| node.recommended[*a])
                .max_by(|a, b| {
                    node.mean_reward(*a)
                        .partial_cmp(&node.mean_reward(*b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{chain_query, SimBehavior, SimEngine};
    use pretty_assertions::assert_eq;

    fn setup(
        tables: usize,
        behavior: SimBehavior,
    ) -> (BrueTree, BatchedExecutor<SimEngine>) {
        let query = Rc::new(chain_query(tables, 1000));
        let config = Rc::new(JoinConfig::default().with_batch_count(1000).with_seed(13));
        let executor = BatchedExecutor::new(
            SimEngine::new(behavior),
            query.clone(),
            config.clone(),
            "rljjoinedq1".to_string(),
        )
        .unwrap();
        (BrueTree::new(query, config), executor)
    }

    #[test]
    fn test_switch_sweeps_all_decision_levels() {
        let (tree, _executor) = setup(4, SimBehavior::Succeed);
        let switches: Vec<_> = (1..=8).map(|round| tree.select_switch(round)).collect();
        assert_eq!(switches, vec![3, 2, 1, 0, 3, 2, 1, 0]);
    }

    #[test]
    fn test_backup_only_at_the_switch_node() {
        let (mut tree, mut executor) = setup(3, SimBehavior::Succeed);
        tree.sample_with_switch(1, 1, &mut executor, 20).unwrap();
        assert_eq!(tree.arena[0].visits, 0);
        let total_visits: u64 = tree.arena.iter().map(|n| n.visits).sum();
        assert_eq!(total_visits, 1);
        let updated = tree.arena.iter().find(|n| n.visits == 1).unwrap();
        assert_eq!(updated.level, 1);
    }

    #[test]
    fn test_switch_zero_updates_the_root() {
        let (mut tree, mut executor) = setup(3, SimBehavior::Succeed);
        tree.sample_with_switch(1, 0, &mut executor, 20).unwrap();
        assert_eq!(tree.arena[0].visits, 1);
    }

    #[test]
    fn test_restart_flags_expansion_away_from_switch() {
        let (mut tree, mut executor) = setup(3, SimBehavior::Succeed);
        let outcome = tree.sample_with_switch(1, 2, &mut executor, 20).unwrap();
        assert!(outcome.expanded);
        assert!(outcome.restart);

        let (mut tree, mut executor) = setup(3, SimBehavior::Succeed);
        let outcome = tree.sample_with_switch(1, 0, &mut executor, 20).unwrap();
        assert!(outcome.expanded);
        assert!(!outcome.restart);
    }

    #[test]
    fn test_prefixes_are_never_duplicated() {
        let (mut tree, mut executor) = setup(3, SimBehavior::Succeed);
        for round in 1..=40 {
            tree.sample(round, &mut executor, 20).unwrap();
        }
        // 3 tables admit 3 + 6 + 6 ordered prefixes plus the root.
        assert!(tree.arena.len() <= 16);
        assert_eq!(tree.arena.len(), tree.prefix_map.len() + 1);
    }

    #[test]
    fn test_dominant_follows_best_mean_reward() {
        let (mut tree, mut executor) = setup(3, SimBehavior::succeed_when_leading("t1"));
        for round in 1..=40 {
            tree.sample(round, &mut executor, 20).unwrap();
        }
        assert_eq!(tree.dominant_order()[0], 1);
    }
}
