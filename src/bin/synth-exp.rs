//! Compares learning policies on simulated chain joins. The simulated engine
//! only lets fragments led by the last chain table finish, so a policy earns
//! its keep by finding that table quickly.

use clap::Parser;
use gethostname::gethostname;
use rljoin::test_utils::{chain_query, SimBehavior, SimEngine};
use rljoin::{bin_utils, JoinConfig, JoinScheduler, LearningPolicy, RunStats};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[arg(short = 't', long, default_value_t = 3)]
    num_trials: usize,

    #[arg(long)]
    output_prefix: Option<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_output: bool,

    #[arg(long)]
    debug: bool,

    #[arg(long, default_value = "3-6", value_parser = bin_utils::parse_comma_range_num_list)]
    num_tables: std::vec::Vec<usize>,

    #[arg(long, default_value_t = 50)]
    num_batches: u32,

    #[arg(long, value_parser = bin_utils::parse_comma_policy_list)]
    policy: Option<std::vec::Vec<LearningPolicy>>,
}

#[derive(Serialize)]
struct ExpHeader {
    policy: String,
    num_tables: usize,
    trial: usize,
}

struct Record {
    header: ExpHeader,
    stats: RunStats,
}

fn main() {
    let args = Args::parse().with_defaults();
    bin_utils::init_logger(args.debug);

    let mut records = vec![];
    for &num_tables in &args.num_tables {
        for &policy in args.policy.as_ref().unwrap() {
            for trial in 0..args.num_trials {
                println!(
                    "Running {} tables trial {} policy {}",
                    num_tables, trial, policy
                );
                let query = chain_query(num_tables, args.num_batches);
                let good_leader = format!("t{}", num_tables - 1);
                let engine = SimEngine::new(SimBehavior::succeed_when_leading(&good_leader));
                let config = JoinConfig::default()
                    .with_policy(policy)
                    .with_batch_count(args.num_batches)
                    .with_bounded_fallback(true)
                    .with_seed(trial as u64);
                let run = JoinScheduler::new(engine, query, config, "synth")
                    .expect("scheduler setup failed")
                    .run()
                    .expect("run failed");
                println!("{:?}", run.stats);
                records.push(Record {
                    header: ExpHeader {
                        policy: policy.to_string(),
                        num_tables,
                        trial,
                    },
                    stats: run.stats,
                });
            }
        }
    }

    if !args.no_output {
        let records = records
            .into_iter()
            .map(|record| (record.header, record.stats))
            .collect();
        bin_utils::write_records(args.output.as_ref().unwrap(), records).unwrap();
    }
}

impl Args {
    fn with_defaults(mut self) -> Self {
        self.output.get_or_insert(bin_utils::default_output_dir().join(format!(
            "{}-{}-{}.csv",
            self.output_prefix
                .as_ref()
                .map(|s| s.as_str())
                .unwrap_or("synth-exp"),
            gethostname().to_string_lossy(),
            chrono::Local::now().format("%FT%H%M%S%z")
        )));

        self.policy.get_or_insert(bin_utils::default_policies());

        self
    }
}
