//! Error types for Metrix

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum MxError {
    #[error("Invalid FFT size: {0} (must be a non-zero power of two)")]
    InvalidFftSize(usize),

    #[error("Channel length mismatch: left {left}, right {right}")]
    ChannelMismatch { left: usize, right: usize },
}

/// Result type alias
pub type MxResult<T> = Result<T, MxError>;
