use strum_macros::{Display, EnumString};

/// Maps the outcome of a successful sampled execution to a reward in [0, 1].
/// Failed attempts always score zero, independent of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RewardModel {
    /// Every success counts 1.
    Binary,
    /// Success discounted by elapsed latency buckets.
    LatencyBuckets,
    /// Success weighted by the executor's per-table progress scaling.
    ScalingWeighted,
}

impl RewardModel {
    pub fn reward(&self, elapsed_ms: u64, scaling: f64) -> f64 {
        match self {
            RewardModel::Binary => 1.0,
            RewardModel::LatencyBuckets => match elapsed_ms {
                0..=9 => 1.0,
                10..=99 => 0.75,
                100..=999 => 0.5,
                1000..=9999 => 0.25,
                _ => 0.1,
            },
            RewardModel::ScalingWeighted => scaling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binary_ignores_latency() {
        assert_eq!(RewardModel::Binary.reward(0, 0.5), 1.0);
        assert_eq!(RewardModel::Binary.reward(100000, 0.5), 1.0);
    }

    #[test]
    fn test_latency_buckets_decrease() {
        let model = RewardModel::LatencyBuckets;
        let rewards: Vec<_> = [5, 50, 500, 5000, 50000]
            .iter()
            .map(|ms| model.reward(*ms, 1.0))
            .collect();
        assert_eq!(rewards, vec![1.0, 0.75, 0.5, 0.25, 0.1]);
    }

    #[test]
    fn test_scaling_weighted_uses_scaling() {
        assert_eq!(RewardModel::ScalingWeighted.reward(5, 0.25), 0.25);
    }
}
