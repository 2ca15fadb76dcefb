pub mod bin_utils;
mod bitmap;
mod config;
mod engine;
mod error;
mod executor;
mod query;
mod reward;
mod scheduler;
mod search;
mod stats;
pub mod test_utils;

pub use bitmap::{BatchId, BatchSet};
pub use config::{naming, JoinConfig, LearningPolicy};
pub use engine::ExecEngine;
pub use error::{EngineError, EngineResult};
pub use executor::BatchedExecutor;
pub use query::{ColumnDef, JoinQuery, JoinSummary, ResultColumn, TableSource};
pub use reward::RewardModel;
pub use scheduler::{JoinRun, JoinScheduler, TimeoutPyramid};
pub use search::{BrueTree, DelegateSearch, SampleOutcome, SearchTree, UctTree};
pub use stats::RunStats;
