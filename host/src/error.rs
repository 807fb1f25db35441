//! Error types at the component seams.
//!
//! None of these are fatal to the long-running loops: the node answers with an
//! error payload, the monitor skips the cycle and tries again on the next tick.

use thiserror::Error;

/// The sensor did not produce a complete reading.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("sensor returned a non-numeric value")]
    NotANumber,

    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },

    #[error("timed out waiting for the data line")]
    Timeout,

    #[error("driver error: {0}")]
    Driver(String),
}

/// One poll cycle failed. The cycle is skipped and nothing is persisted.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("node reported a sensor failure")]
    SensorFault,

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The history file could not be read or written.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}
