use std::io::ErrorKind;
use std::process;

use clap::Parser;
use cli::{Args, Command};
use dataprep::prelude::*;
use rayon::ThreadPoolBuilder;

mod cli;
mod commands;

fn num_threads(args: &Args) -> usize {
    if let Some(num_threads) = args.num_jobs {
        return num_threads;
    }

    if let Ok(config) = Config::discover() {
        if let Some(num_threads) = config.num_jobs() {
            return num_threads;
        }
    }

    0
}

fn run(args: Args) -> DataprepResult<()> {
    match args.cmd {
        Command::Completions(cmd) => cmd.execute(),
        Command::Fetch(cmd) => cmd.execute(),
        Command::Hierarchy(cmd) => cmd.execute(),
        Command::Init(cmd) => cmd.execute(),
        Command::Prepare(cmd) => cmd.execute(),
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("DATAPREP_LOG", "info"),
    )
    .format_timestamp(None)
    .init();

    // `--verbose` raises the level again
    if std::env::var_os("DATAPREP_LOG").is_none() {
        log::set_max_level(log::LevelFilter::Warn);
    }

    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(num_threads(&args))
        .build_global()
    {
        eprintln!("error: {e:#}");
        process::exit(1);
    }

    match run(args) {
        Ok(()) => process::exit(0),
        Err(DataprepError::IO(e)) if e.kind() == ErrorKind::BrokenPipe => {
            process::exit(0)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
