mod algorithm;
mod config;
mod error;
mod report;
mod rijndael_cipher;
mod runner;

use std::io::{self, Write};
use std::process;

use clap::Parser;
use log::{error, warn};

use crate::algorithm::DEFAULT_SUITE;
use crate::config::{Args, BenchConfig, LOG_ENV};
use crate::runner::BenchmarkRunner;

fn init_logging() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_env(LOG_ENV)
        .init();
}

fn main() {
    init_logging();

    let config = BenchConfig::from(Args::parse());

    let runner = BenchmarkRunner::new(config);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = runner
        .run_all(&DEFAULT_SUITE, &mut out)
        .and_then(|failures| out.flush().map(|_| failures));

    match result {
        Ok(0) => {}
        Ok(failures) => warn!("{} of {} algorithms failed", failures, DEFAULT_SUITE.len()),
        Err(e) => {
            error!("could not write report: {}", e);
            process::exit(1);
        }
    }
}
