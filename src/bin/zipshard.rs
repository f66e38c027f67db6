//! Zipshard CLI
//!
//! Splits directories and zip/jar archives into one primary archive plus
//! size-capped secondary archives, printing the secondary paths produced.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zipshard_rs::{CanaryStrategy, SplitConfig, SplitStrategy, Splitter};

#[derive(Parser, Debug)]
#[command(name = "zipshard")]
#[command(about = "Split compiled-code archives under per-archive size limits")]
struct Args {
    /// Input units: directories or zip/jar archives, processed in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Path of the primary output archive
    #[arg(short = 'o', long)]
    primary_out: PathBuf,

    /// Directory receiving secondary archives
    #[arg(short = 's', long)]
    secondary_dir: PathBuf,

    /// Secondary archive name pattern with one {} index placeholder
    #[arg(long, default_value = "secondary-{}.jar")]
    secondary_pattern: String,

    /// Soft size limit in bytes; the current secondary archive rotates at
    /// the next input-unit boundary once it reaches this size
    #[arg(long, default_value_t = 50 * 1024 * 1024)]
    soft_limit: u64,

    /// Hard size limit in bytes; no archive ever exceeds this
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    hard_limit: u64,

    /// Packing strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::MaximizePrimary)]
    strategy: StrategyArg,

    /// Inject a canary entry into every secondary archive
    #[arg(long)]
    canary: bool,

    /// Directory for per-archive report manifests
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Entry path prefix that must land in the primary archive; repeatable
    #[arg(long = "primary-prefix")]
    primary_prefixes: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    MaximizePrimary,
    MinimizePrimary,
}

impl From<StrategyArg> for SplitStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::MaximizePrimary => SplitStrategy::MaximizePrimary,
            StrategyArg::MinimizePrimary => SplitStrategy::MinimizePrimary,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut builder = SplitConfig::builder()
        .inputs(args.inputs)
        .primary_out(args.primary_out)
        .secondary_dir(args.secondary_dir)
        .secondary_pattern(args.secondary_pattern)
        .soft_limit(args.soft_limit)
        .hard_limit(args.hard_limit)
        .strategy(args.strategy.into())
        .canary(if args.canary {
            CanaryStrategy::Include
        } else {
            CanaryStrategy::None
        });
    if let Some(report_dir) = args.report_dir {
        builder = builder.report_dir(report_dir);
    }
    let config = builder.build().context("invalid configuration")?;

    let prefixes = args.primary_prefixes;
    let required_in_primary =
        Box::new(move |path: &str| prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())));

    let mut splitter = Splitter::new(config, required_in_primary);
    let secondaries = splitter.execute().context("split failed")?;
    for path in &secondaries {
        println!("{}", path.display());
    }
    Ok(())
}
