//! Executing a single relative move with a stop-on-drop guard.

use std::time::Duration;

use ranger_kinematics::WheelTargets;
use spin_sleep::SpinSleeper;
use tracing::{debug, error, warn};

use crate::error::HalError;
use crate::traits::{Mileage, MotorDrive};

/// Guards one physical move.
///
/// The move is commanded on construction. Unless [`MotionGuard::complete`]
/// observes the wheels settle, dropping the guard stops the drive.
pub struct MotionGuard<'a, D: MotorDrive + ?Sized> {
    drive: &'a mut D,
    targets: WheelTargets,
    settled: bool,
}

impl<'a, D: MotorDrive + ?Sized> MotionGuard<'a, D> {
    /// Command `targets` on `drive`.
    ///
    /// If the command itself fails the drive is stopped before the error is returned.
    pub fn begin(drive: &'a mut D, targets: WheelTargets) -> Result<Self, HalError> {
        let mut guard = Self {
            drive,
            targets,
            settled: false,
        };
        guard.drive.command_relative_move(targets)?;
        debug!(left = targets.left, right = targets.right, "Move commanded");
        Ok(guard)
    }

    /// Poll the mileage every `poll_interval` until two consecutive readings match.
    ///
    /// Returns the settled mileage. Any poll failure ends the wait and, once the
    /// guard is dropped, stops the drive.
    pub fn complete(mut self, poll_interval: Duration) -> Result<Mileage, HalError> {
        let sleeper = SpinSleeper::default();
        let mut previous = self.drive.poll_mileage()?;
        let mut polls: u32 = 1;
        loop {
            sleeper.sleep(poll_interval);
            let current = self.drive.poll_mileage()?;
            polls += 1;
            if current == previous {
                self.settled = true;
                debug!(mileage = %current, polls, "Move settled");
                return Ok(current);
            }
            previous = current;
        }
    }
}

impl<D: MotorDrive + ?Sized> Drop for MotionGuard<'_, D> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(targets = %self.targets, "Move did not complete, stopping drive");
        if let Err(e) = self.drive.stop() {
            error!(error = %e, "Failed to stop drive");
        }
    }
}

/// Command `targets` and wait for the wheels to settle.
pub fn execute_move<D: MotorDrive + ?Sized>(
    drive: &mut D,
    targets: WheelTargets,
    poll_interval: Duration,
) -> Result<Mileage, HalError> {
    MotionGuard::begin(drive, targets)?.complete(poll_interval)
}
