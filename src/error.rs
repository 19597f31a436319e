use std::{io, path::PathBuf};

use thiserror::Error;

use crate::bias::{MAX_BIAS, MIN_BIAS};

/// `BiasError` enumerates every way applying the performance bias can fail.
/// Each variant maps to a stable process exit status through [BiasError::exit_code].
#[derive(Debug, Error)]
pub enum BiasError {
    #[error("this program needs root privileges")]
    NotPrivileged,

    #[error("energy_perf_bias is not supported on this system")]
    Unsupported,

    #[error("expected exactly one value argument")]
    BadArgumentCount,

    #[error("please provide a valid number, got {0:?}")]
    InvalidNumber(String),

    #[error("value must be between {min} and {max}, got {0}", min = MIN_BIAS, max = MAX_BIAS)]
    OutOfRange(String),

    #[error("failed to open the CPU directory {}: {source}", path.display())]
    Enumeration { path: PathBuf, source: io::Error },

    #[error("failed to open {}: {source}", path.display())]
    PathOpen { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    PathWrite { path: PathBuf, source: io::Error },

    #[error("failed to drop privileges: {0:#}")]
    PrivilegeDrop(anyhow::Error),

    #[error("failed to serialize the report: {0}")]
    Report(#[from] serde_json::Error),
}

impl BiasError {
    /// `exit_code` returns the process exit status for the error.
    /// `PathOpen` and `PathWrite` are only ever logged, but they keep a code of
    /// their own so the table stays complete.
    pub fn exit_code(&self) -> i32 {
        match self {
            BiasError::NotPrivileged => 1,
            BiasError::BadArgumentCount => 2,
            BiasError::InvalidNumber(_) => 3,
            BiasError::OutOfRange(_) => 4,
            BiasError::Unsupported => 5,
            BiasError::Enumeration { .. } => 6,
            BiasError::PrivilegeDrop(_) => 7,
            BiasError::PathOpen { .. } => 8,
            BiasError::PathWrite { .. } => 9,
            BiasError::Report(_) => 10,
        }
    }

    /// `is_range_error` reports whether the diagnostic should be followed by
    /// the accepted range hint.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            BiasError::BadArgumentCount | BiasError::InvalidNumber(_) | BiasError::OutOfRange(_)
        )
    }
}
