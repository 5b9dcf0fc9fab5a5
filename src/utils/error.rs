use thiserror::Error;

use crate::ml::ModelError;
use crate::output::crypto::CryptoError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from pcap library
    #[error("PCAP error: {0}")]
    PcapError(#[from] pcap::Error),

    /// Error from I/O operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Model parameters could not be loaded or applied
    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),

    /// Output file encryption or decryption failed
    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),

    /// Error from CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from capture operations
    #[error("Capture error: {0}")]
    CaptureError(String),

    /// Invalid command line configuration
    #[error("Config error: {0}")]
    ConfigError(String),
}

/// Result type for application
pub type AppResult<T> = Result<T, AppError>;
