use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::algorithm::CipherFamily;

/// Anything that can abort the measurement of a single cipher row.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{family} does not support a {bits}-bit key")]
    UnsupportedKeySize { family: CipherFamily, bits: usize },

    #[error("disk artifact {path}: {source}")]
    DiskIOFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{algorithm} transform failed: {reason}")]
    TransformFailure { algorithm: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BenchError>;
