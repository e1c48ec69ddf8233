use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use redblack::dispatch::{self, DrainMode, PoolConfig};
use redblack::input;
use redblack::rbtree::RbTree;
use redblack::report;

/// Runs a batch of searches and mutations against a red-black tree, searches
/// first, and writes a report with the execution log and the final tree.
#[derive(Parser)]
struct Args {
    /// Job description: initial tree, worker counts, operation list.
    input: PathBuf,
    /// Where the report goes.
    #[arg(short, long, default_value = "out.txt")]
    output: PathBuf,
    /// Each worker processes at most one queue item instead of draining.
    #[arg(long)]
    one_item: bool,
    /// More logging (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let job = input::parse_job(&text)?;
    let mut tree = RbTree::from_preorder(&job.shape).context("initial tree description")?;
    info!("parsed {} operation(s) over a tree of {} node(s)", job.ops.len(), tree.len());

    let config = PoolConfig {
        search_workers: job.search_workers,
        modify_workers: job.modify_workers,
        mode: if args.one_item { DrainMode::OneItemPerWorker } else { DrainMode::DrainQueue },
    };
    let outcome = dispatch::run(&mut tree, &job.ops, config)?;

    fs::write(&args.output, report::render(&outcome, &tree))
        .with_context(|| format!("writing {}", args.output.display()))?;
    Ok(())
}

fn init_logging(verbose: u8) {
    use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}
