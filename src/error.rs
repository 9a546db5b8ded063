use crate::registers::Quantity;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request on an open bus session.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("device exception: {0}")]
    Exception(String),

    #[error("short response: expected {expected} registers, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Modbus connection error: {0}")]
    Connection(String),

    #[error("Failed to read {quantity} at register {address:#06x}: {source}")]
    Read {
        quantity: Quantity,
        address: u16,
        #[source]
        source: BusError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// True when the bus could not be reached at all, as opposed to a
    /// failed read on an open session.
    pub fn is_connection(&self) -> bool {
        matches!(self, ExporterError::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
