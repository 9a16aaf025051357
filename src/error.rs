use std::num::ParseIntError;

use thiserror::Error;

/// Why a seed could not be obtained from the remote service.
///
/// Every variant is recovered by falling back to a locally generated seed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Connection, TLS, or timeout failure.
    #[error("seed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("seed service returned {0}")]
    Status(reqwest::StatusCode),

    #[error("seed body {body:?} is not an integer: {source}")]
    Parse { body: String, source: ParseIntError },

    #[error("seed {0} is outside 0..=100000")]
    OutOfRange(u64),
}

/// Text that does not name a usable toggle key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("no key given")]
    Empty,

    #[error("unknown key {0:?}")]
    Unknown(String),
}
