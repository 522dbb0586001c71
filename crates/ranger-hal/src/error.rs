//! Error types for hardware access.

use thiserror::Error;

/// Errors raised by drive and sensor implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The drive could not execute or report a move.
    #[error("actuation failed: {0}")]
    Actuation(String),
    /// A single sensor read failed; the caller may retry.
    #[error("sensor read failed: {0}")]
    SensorRead(String),
    /// The emergency stop latch is engaged.
    #[error("emergency stop engaged")]
    EmergencyStop,
}
