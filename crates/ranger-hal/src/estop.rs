//! Shared emergency-stop latch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::error::HalError;

/// A latch shared between the supervisor and the drive.
///
/// Once engaged it stays engaged until explicitly released. Drives check it
/// before every command and poll.
#[derive(Debug, Clone, Default)]
pub struct EmergencyStop {
    engaged: Arc<AtomicBool>,
}

impl EmergencyStop {
    /// A released latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage the latch.
    pub fn engage(&self, reason: &str) {
        if !self.engaged.swap(true, Ordering::SeqCst) {
            warn!(reason, "Emergency stop engaged");
        }
    }

    /// Release the latch.
    pub fn release(&self) {
        self.engaged.store(false, Ordering::SeqCst);
    }

    /// Whether the latch is engaged.
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// `Err(HalError::EmergencyStop)` while engaged.
    pub fn check(&self) -> Result<(), HalError> {
        if self.is_engaged() {
            Err(HalError::EmergencyStop)
        } else {
            Ok(())
        }
    }
}
