use std::path::PathBuf;

use clap::Parser;

/// 10 MiB
pub const DATA_SIZE: usize = 10 * 1024 * 1024;

pub const ARTIFACT_FILE: &str = "testdata.bin";

pub const LOG_ENV: &str = "CIPHER_BENCH_LOG";

/// Symmetric cipher throughput benchmark. Runs the full suite when no flags are given.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Size of the random test buffer in bytes
    #[arg(long, default_value_t = DATA_SIZE, value_parser = parse_data_size)]
    pub data_size: usize,

    /// File used for the disk-path measurements, created if absent
    #[arg(long, default_value = ARTIFACT_FILE)]
    pub artifact: PathBuf,
}

fn parse_data_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("the test buffer must hold at least one byte".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub data_size: usize,
    pub artifact_path: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            data_size: DATA_SIZE,
            artifact_path: PathBuf::from(ARTIFACT_FILE),
        }
    }
}

impl From<Args> for BenchConfig {
    fn from(args: Args) -> Self {
        BenchConfig {
            data_size: args.data_size,
            artifact_path: args.artifact,
        }
    }
}
