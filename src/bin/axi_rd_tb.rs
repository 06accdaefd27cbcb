use axi_rd_tb::prelude::*;
use clap::Parser;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Randomized read traffic through an N-master, 4-slave AXI4 crossbar with scoreboarding.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of masters (1-4)
    #[arg(short, long)]
    masters: Option<usize>,

    /// Completed transactions after which a master stops issuing
    #[arg(long)]
    finish_after: Option<u32>,

    /// Abort after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// JUnit XML output
    #[arg(long)]
    junit: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match TbConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(masters) = args.masters {
        config.masters = masters;
    }
    if let Some(finish_after) = args.finish_after {
        config.finish_after = finish_after;
    }
    if args.max_cycles.is_some() {
        config.max_cycles = args.max_cycles;
    }
    if args.junit.is_some() {
        config.junit_path = args.junit;
    }
    let junit_path = config.junit_path.clone();

    let tb = match Testbench::new(config) {
        Ok(tb) => tb,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let report = tb.run();
    report.print_summary();

    if let Some(path) = junit_path {
        if let Err(e) = report.write_junit(&path) {
            error!("Could not write {}: {}", path.display(), e);
        }
    }

    match report.passed() {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}
