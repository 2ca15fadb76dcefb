use crate::engine::ExecEngine;
use crate::error::EngineResult;
use crate::executor::BatchedExecutor;
use crate::query::JoinQuery;
use crate::reward::RewardModel;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;

pub(crate) type NodeId = usize;

/// One node of a join-order search tree. Actions are indices into
/// `next_table`; statistics are kept per action.
pub(crate) struct SearchNode {
    /// Round the node was created in; gates expansion to one node per round.
    pub created_in: u64,
    /// Number of tables already placed when this node is reached.
    pub level: usize,
    pub action_count: usize,
    /// Actions not yet tried, drawn uniformly before any exploitation.
    pub untried: Vec<usize>,
    pub children: Vec<Option<NodeId>>,
    pub visits: u64,
    pub tries: Vec<u64>,
    pub acc_reward: Vec<f64>,
    /// Tables placed on the path to this node, in order.
    pub joined: Vec<usize>,
    /// Candidate table per action.
    pub next_table: Vec<usize>,
    /// Per-action connectivity under the cartesian-avoidance heuristic.
    /// All true when the heuristic is off or nothing connects.
    pub recommended: Vec<bool>,
}

impl SearchNode {
    pub fn root(round: u64, query: &JoinQuery) -> Self {
        let table_count = query.table_count();
        Self::with_prefix(round, Vec::new(), (0..table_count).collect(), query, false)
    }

    /// Child reached by appending `table` to the parent's join prefix.
    pub fn expand(parent: &SearchNode, round: u64, table: usize, query: &JoinQuery, use_heuristic: bool) -> Self {
        let mut joined = parent.joined.clone();
        joined.push(table);
        let unjoined = parent
            .next_table
            .iter()
            .copied()
            .filter(|t| *t != table)
            .collect();
        Self::with_prefix(round, joined, unjoined, query, use_heuristic)
    }

    fn with_prefix(
        round: u64,
        joined: Vec<usize>,
        next_table: Vec<usize>,
        query: &JoinQuery,
        use_heuristic: bool,
    ) -> Self {
        let action_count = next_table.len();
        let mut recommended: Vec<bool> = if use_heuristic {
            next_table
                .iter()
                .map(|t| query.connected(&joined, *t))
                .collect()
        } else {
            vec![true; action_count]
        };
        if !recommended.iter().any(|r| *r) {
            recommended = vec![true; action_count];
        }
        let untried = (0..action_count).filter(|a| recommended[*a]).collect();
        Self {
            created_in: round,
            level: joined.len(),
            action_count,
            untried,
            children: vec![None; action_count],
            visits: 0,
            tries: vec![0; action_count],
            acc_reward: vec![0.0; action_count],
            joined,
            next_table,
            recommended,
        }
    }

    pub fn update(&mut self, action: usize, reward: f64) {
        self.visits += 1;
        self.tries[action] += 1;
        self.acc_reward[action] += reward;
    }

    pub fn mean_reward(&self, action: usize) -> f64 {
        if self.tries[action] == 0 {
            0.0
        } else {
            self.acc_reward[action] / self.tries[action] as f64
        }
    }

    /// Fills `order` beyond this node's level with a random completion,
    /// preferring connected tables under the heuristic.
    pub fn complete_order_random(
        &self,
        order: &mut [usize],
        query: &JoinQuery,
        use_heuristic: bool,
        rng: &mut StdRng,
    ) {
        let last = order[self.level];
        let mut shuffled: Vec<usize> = self.next_table.clone();
        shuffled.shuffle(rng);
        if use_heuristic {
            let mut placed = self.joined.clone();
            placed.push(last);
            for pos in self.level + 1..order.len() {
                let next = shuffled
                    .iter()
                    .copied()
                    .find(|t| !placed.contains(t) && query.connected(&placed, *t))
                    .or_else(|| shuffled.iter().copied().find(|t| !placed.contains(t)));
                match next {
                    Some(table) => {
                        order[pos] = table;
                        placed.push(table);
                    }
                    None => break,
                }
            }
        } else {
            let mut iter = shuffled.iter().copied().filter(|t| *t != last);
            for pos in self.level + 1..order.len() {
                match iter.next() {
                    Some(table) => order[pos] = table,
                    None => break,
                }
            }
        }
    }
}

/// Runs a completed order through the executor and scores the attempt.
pub(crate) fn evaluate_order<E: ExecEngine>(
    order: &[usize],
    executor: &mut BatchedExecutor<E>,
    timeout_ms: u64,
    model: RewardModel,
) -> EngineResult<f64> {
    let started = Instant::now();
    let success = executor.execute(order, timeout_ms)?;
    if !success {
        return Ok(0.0);
    }
    let elapsed = started.elapsed().as_millis() as u64;
    let scaling = executor.reward_scaling(order[0]);
    Ok(model.reward(elapsed, scaling))
}

/// Uniform random offset for tie-breaking scans over actions.
pub(crate) fn random_offset(rng: &mut StdRng, action_count: usize) -> usize {
    rng.gen_range(0..action_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::chain_query;
    use rand::SeedableRng;

    #[test]
    fn test_root_recommends_all_tables() {
        let query = chain_query(4, 10);
        let root = SearchNode::root(1, &query);
        assert_eq!(root.action_count, 4);
        assert!(root.recommended.iter().all(|r| *r));
        assert_eq!(root.untried.len(), 4);
    }

    #[test]
    fn test_expansion_restricts_to_connected_tables() {
        // Chain t0-t1-t2-t3: after placing t0, only t1 connects.
        let query = chain_query(4, 10);
        let root = SearchNode::root(1, &query);
        let child = SearchNode::expand(&root, 1, 0, &query, true);
        assert_eq!(child.joined, vec![0]);
        assert_eq!(child.next_table, vec![1, 2, 3]);
        assert_eq!(child.recommended, vec![true, false, false]);
        assert_eq!(child.untried, vec![0]);
    }

    #[test]
    fn test_heuristic_completion_yields_connected_orders() {
        let query = chain_query(5, 10);
        let root = SearchNode::root(1, &query);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut order = vec![0; 5];
            order[0] = 2;
            root.complete_order_random(&mut order, &query, true, &mut rng);
            let mut seen: Vec<usize> = order.clone();
            seen.sort();
            assert_eq!(seen, vec![0, 1, 2, 3, 4]);
            for pos in 1..5 {
                assert!(query.connected(&order[..pos], order[pos]));
            }
        }
    }

    #[test]
    fn test_plain_completion_is_a_permutation() {
        let query = chain_query(4, 10);
        let root = SearchNode::root(1, &query);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut order = vec![0; 4];
            order[0] = 3;
            root.complete_order_random(&mut order, &query, false, &mut rng);
            let mut seen: Vec<usize> = order.clone();
            seen.sort();
            assert_eq!(seen, vec![0, 1, 2, 3]);
        }
    }
}
