//! Error types for the compression tool.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input, output or dictionary resource cannot be opened.
    #[error("cannot open {path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored payload was found but no preprocessing dictionary was given.
    #[error("stored payload requires a preprocessing dictionary")]
    MissingDictionary,

    /// Generation needs at least one sample byte to derive an alphabet.
    #[error("generation sample is empty")]
    EmptySample,

    /// Compressed stream ended before the declared payload length.
    #[error("compressed stream is truncated")]
    Truncated,

    /// I/O error from an underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
