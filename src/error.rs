//! Error types for arithmetic coding.

use thiserror::Error;

/// Error variants for codec and model operations.
///
/// Every variant is a contract violation by the caller, not a recoverable
/// runtime condition: a codec or model that has reported an error should be
/// re-armed from scratch before further use.
#[derive(Debug, Error)]
pub enum Error {
    /// Alphabet size outside the supported `2..=2048` range.
    #[error("invalid alphabet size: {0}")]
    InvalidAlphabetSize(u32),

    /// Symbol does not fit the model's alphabet.
    #[error("symbol {symbol} out of range for alphabet of {alphabet}")]
    SymbolOutOfRange {
        /// The offending symbol.
        symbol: u32,
        /// The model's alphabet size.
        alphabet: u32,
    },

    /// A probability is outside `[0, 1]`.
    #[error("invalid probability: {0}")]
    InvalidProbability(f32),

    /// Probabilities do not sum to 1 within tolerance.
    #[error("probabilities sum to {0}, expected 1")]
    InvalidProbabilitySum(f32),

    /// Probability array length does not match the alphabet.
    #[error("distribution has {got} entries, alphabet needs {expected}")]
    DistributionLength {
        /// The alphabet size the array must cover.
        expected: u32,
        /// The length actually supplied.
        got: usize,
    },

    /// Operation issued while the codec is in the wrong mode.
    #[error("operation invalid in current codec mode")]
    ModeMismatch,

    /// Encoder or decoder started with no code buffer set.
    #[error("no code buffer set")]
    BufferNotSet,

    /// Raw bit I/O with a width outside `1..=20`.
    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),

    /// Raw data does not fit the declared bit width.
    #[error("data {data} does not fit in {bits} bits")]
    DataTooWide {
        /// The value passed in.
        data: u32,
        /// The declared width.
        bits: u32,
    },

    /// Compressed output exceeded the code buffer.
    #[error("code buffer overflow: {used} bytes used, {capacity} available")]
    BufferOverflow {
        /// Bytes the encoder needed.
        used: usize,
        /// Bytes the buffer holds.
        capacity: usize,
    },
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
