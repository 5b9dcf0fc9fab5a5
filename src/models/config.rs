use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Capture from a live device instead of a file
    pub live: bool,

    /// Network device to capture from
    pub device: String,

    /// pcap/pcapng file to read when not live
    pub file: Option<PathBuf>,

    /// Snapshot length for live capture
    pub snaplen: i32,

    /// Enable promiscuous mode
    pub promiscuous: bool,

    /// Read timeout for live capture, in milliseconds
    pub timeout_ms: i32,

    /// BPF filter expression
    pub filter: Option<String>,

    /// Stop after this many packets
    pub max_packets: Option<usize>,

    /// Directory holding the model parameter files
    pub model_dir: PathBuf,

    /// Directory the result files are written to
    pub output_dir: PathBuf,

    /// Also write a JSON report
    pub json: bool,

    /// Passphrase used to encrypt the result files
    pub encrypt_key: Option<String>,

    /// Decryption mode settings
    pub decrypt: Option<DecryptConfig>,
}

/// Settings for decrypting a previously written result file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptConfig {
    pub key: Option<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            live: false,
            device: "en0".to_string(),
            file: None,
            snaplen: 1024,
            promiscuous: false,
            timeout_ms: 1000,
            filter: None,
            max_packets: None,
            model_dir: PathBuf::from("ml/parameters"),
            output_dir: PathBuf::from("output"),
            json: false,
            encrypt_key: None,
            decrypt: None,
        }
    }
}

impl AppConfig {
    /// Check option combinations that clap cannot express
    pub fn validate(&self) -> AppResult<()> {
        if let Some(decrypt) = &self.decrypt {
            if decrypt.key.is_none() || decrypt.input.is_none() || decrypt.output.is_none() {
                return Err(AppError::ConfigError(
                    "decrypt mode requires --decrypt-key, --in, and --out".to_string(),
                ));
            }
            if self.encrypt_key.is_some() {
                return Err(AppError::ConfigError(
                    "--encrypt-key cannot be used with --decrypt".to_string(),
                ));
            }
            return Ok(());
        }

        if !self.live && self.file.is_none() {
            return Err(AppError::ConfigError(
                "--file must be set when --live is not".to_string(),
            ));
        }
        if self.max_packets == Some(0) {
            return Err(AppError::ConfigError(
                "--max-packets must be greater than zero".to_string(),
            ));
        }
        if self.encrypt_key.as_deref() == Some("") {
            return Err(AppError::ConfigError(
                "--encrypt-key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
