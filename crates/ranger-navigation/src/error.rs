//! This module defines the error types used by the `ranger-navigation` crate.

#![warn(missing_docs)]

use ranger_hal::HalError;
use ranger_localization::LocalizationError;
use thiserror::Error;

/// Error type for navigation operations.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// The sonar could not deliver enough good readings within its attempt budget.
    #[error("sonar gave {successes} usable readings in {attempts} attempts")]
    SensorTransient {
        /// Reads attempted.
        attempts: usize,
        /// Reads that succeeded.
        successes: usize,
    },
    /// The particle filter rejected an update.
    #[error(transparent)]
    Localization(#[from] LocalizationError),
    /// A physical move failed; the drive has been stopped.
    #[error("actuation failed")]
    Actuation(#[source] HalError),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl NavigationError {
    /// Whether this error must end the whole plan regardless of failure policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NavigationError::Actuation(HalError::EmergencyStop) | NavigationError::InvalidConfig(_)
        )
    }
}
