//! CLI tool for running shard bootstrap chains.

mod config;
mod error;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use snafu::ResultExt;

use shard_bootstrap_core::{
    bootstrapper::BootstrapOutcome,
    options::TimeBucket,
    process::BootstrapProcess,
    report::ShardReport,
    shard_result::ShardId,
    time_range::{TimeRange, TimeRanges},
};

use crate::{
    config::{ChainConfig, parse_bucket},
    error::{
        CliError, CliResult, InvalidTimestampSnafu, InvalidWindowSnafu, ProcessSnafu,
        ReportSnafu, SerializeReportSnafu,
    },
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Bootstrap shards through the configured chain and report coverage
    Run {
        /// JSON chain description
        #[arg(long)]
        config: PathBuf,

        /// Repeatable shard id
        #[arg(long = "shard", required = true)]
        shards: Vec<ShardId>,

        /// Window start (RFC 3339); requires --end
        #[arg(long)]
        start: Option<String>,

        /// Window end (RFC 3339); requires --start
        #[arg(long)]
        end: Option<String>,

        /// Reference time for the retention window (RFC 3339, default: now)
        #[arg(long)]
        now: Option<String>,

        /// Override bootstrap_concurrency from the config (0 = one per CPU)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Granularity of gap reporting, e.g. 1h, 15m
        #[arg(long = "coverage-bucket", default_value = "1h")]
        coverage_bucket: String,

        /// Print reports as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Exit non-zero if any shard is left with unfulfilled ranges
        #[arg(long = "fail-on-gap", default_value_t = false)]
        fail_on_gap: bool,
    },

    /// Print the chain order and the retention window without bootstrapping
    Plan {
        /// JSON chain description
        #[arg(long)]
        config: PathBuf,

        /// Reference time for the retention window (RFC 3339, default: now)
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "shardboot", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

struct RunArgs {
    config: PathBuf,
    shards: Vec<ShardId>,
    start: Option<String>,
    end: Option<String>,
    now: Option<String>,
    concurrency: Option<usize>,
    coverage_bucket: String,
    json: bool,
    fail_on_gap: bool,
}

fn parse_timestamp(flag: &'static str, value: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .context(InvalidTimestampSnafu {
            flag,
            value: value.to_string(),
        })
}

fn resolve_now(now: Option<&str>) -> CliResult<DateTime<Utc>> {
    match now {
        Some(value) => parse_timestamp("--now", value),
        None => Ok(Utc::now()),
    }
}

fn resolve_target(
    args: &RunArgs,
    retention_window: impl FnOnce(DateTime<Utc>) -> TimeRange,
) -> CliResult<TimeRanges> {
    match (&args.start, &args.end) {
        (Some(start), Some(end)) => {
            let start = parse_timestamp("--start", start)?;
            let end = parse_timestamp("--end", end)?;
            let range = TimeRange::new(start, end).context(InvalidWindowSnafu)?;
            Ok(TimeRanges::from(range))
        }
        (None, None) => {
            let now = resolve_now(args.now.as_deref())?;
            Ok(TimeRanges::from(retention_window(now)))
        }
        _ => Err(CliError::PartialWindow),
    }
}

fn build_reports(
    target: &TimeRanges,
    outcomes: &BTreeMap<ShardId, BootstrapOutcome>,
    bucket: &TimeBucket,
) -> CliResult<Vec<ShardReport>> {
    outcomes
        .iter()
        .map(|(shard, outcome)| {
            ShardReport::new(*shard, target, outcome, bucket).context(ReportSnafu { shard: *shard })
        })
        .collect()
}

fn print_reports(reports: &[ShardReport], json: bool) -> CliResult<()> {
    if json {
        let text = serde_json::to_string_pretty(reports).context(SerializeReportSnafu)?;
        println!("{text}");
        return Ok(());
    }

    for report in reports {
        println!("{report}");
        for gap in &report.gaps {
            println!("  gap {gap}");
        }
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> CliResult<()> {
    let config = ChainConfig::load(&args.config)?;
    let mut opts = config.options()?;
    if let Some(concurrency) = args.concurrency {
        opts = opts.with_bootstrap_concurrency(concurrency);
    }
    let bucket = parse_bucket("--coverage-bucket", &args.coverage_bucket)?;

    let target = resolve_target(&args, |now| opts.retention_window(now))?;
    let chain = config.build_chain(&opts);
    info!("bootstrapping through {chain}");

    let process = BootstrapProcess::new(chain, opts);
    let outcomes = process.run(&args.shards, &target).context(ProcessSnafu)?;

    let reports = build_reports(&target, &outcomes, &bucket)?;
    print_reports(&reports, args.json)?;

    if args.fail_on_gap {
        let incomplete: Vec<String> = reports
            .iter()
            .filter(|r| !r.is_complete())
            .map(|r| r.shard.to_string())
            .collect();
        if !incomplete.is_empty() {
            return Err(CliError::Incomplete {
                shards: incomplete.join(", "),
            });
        }
    }
    Ok(())
}

fn cmd_plan(config: &Path, now: Option<&str>) -> CliResult<()> {
    let config = ChainConfig::load(config)?;
    let opts = config.options()?;
    let now = resolve_now(now)?;

    println!("chain: {}", config.build_chain(&opts));
    println!("retention window: {}", opts.retention_window(now));
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Run {
            config,
            shards,
            start,
            end,
            now,
            concurrency,
            coverage_bucket,
            json,
            fail_on_gap,
        } => cmd_run(RunArgs {
            config,
            shards,
            start,
            end,
            now,
            concurrency,
            coverage_bucket,
            json,
            fail_on_gap,
        }),
        Command::Plan { config, now } => cmd_plan(&config, now.as_deref()),
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
