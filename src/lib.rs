//! Adaptive LSTM-driven arithmetic coding compressor.
//!
//! A single recurrent model is trained online, symbol by symbol, while the
//! stream is coded. The decoder replays the identical predict/observe
//! sequence, so both sides stay synchronized without ever exchanging model
//! parameters. The same byte-level model doubles as a generative sampler.

pub mod codec;
pub mod entropy_coding;
pub mod error;
pub mod generate;
pub mod header;
pub mod helpers;
pub mod macros;
pub mod models;
pub mod preprocess;
pub mod vocab;

pub use codec::{compress, decompress, Decompressed};
pub use error::{Error, Result};
pub use generate::generate;
