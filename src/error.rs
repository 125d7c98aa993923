//! Error types for ebvcheck.

use thiserror::Error;

use crate::model::{Seq, WorkKey};

#[derive(Debug, Error)]
pub enum Error {
    /// The key is already in flight. Callers skip it without consuming a slot.
    #[error("package already in flight: {0}")]
    DuplicateKey(WorkKey),

    /// A sequence number was submitted twice or was never issued.
    #[error("sequence {seq} is out of range (next to release: #{next})")]
    OutOfRangeSequence { seq: Seq, next: u64 },

    #[error("command `{command}` exited with status {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
