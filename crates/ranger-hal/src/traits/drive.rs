use std::fmt;

use ranger_kinematics::WheelTargets;

use crate::error::HalError;

/// Absolute encoder mileage of both wheels, in drive units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mileage {
    /// Left wheel counter.
    pub left: f64,
    /// Right wheel counter.
    pub right: f64,
}

impl Mileage {
    /// Construct a mileage reading.
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Wheel increments from `earlier` to `self`.
    pub fn since(&self, earlier: Mileage) -> WheelTargets {
        WheelTargets::new(self.left - earlier.left, self.right - earlier.right)
    }

    /// The mileage reached after adding `targets`.
    pub fn advanced_by(&self, targets: WheelTargets) -> Mileage {
        Mileage::new(self.left + targets.left, self.right + targets.right)
    }
}

impl fmt::Display for Mileage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L: {:.1}, R: {:.1})", self.left, self.right)
    }
}

/// Speed and acceleration limits applied by the motor controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveLimits {
    /// Maximum wheel speed, drive units per second.
    pub speed: f64,
    /// Maximum wheel acceleration, drive units per second squared.
    pub acceleration: f64,
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            speed: 100.0,
            acceleration: 300.0,
        }
    }
}

/// Core trait for a differential drive that executes relative position moves.
pub trait MotorDrive {
    /// Command both wheels to move by the given increments.
    ///
    /// Returns as soon as the command is accepted; completion is observed
    /// through [`poll_mileage`](Self::poll_mileage).
    fn command_relative_move(&mut self, targets: WheelTargets) -> Result<(), HalError>;

    /// Read the absolute encoder mileage.
    fn poll_mileage(&mut self) -> Result<Mileage, HalError>;

    /// Stop both wheels immediately.
    fn stop(&mut self) -> Result<(), HalError>;

    /// Apply speed and acceleration limits. Drives without configurable limits ignore this.
    fn set_limits(&mut self, _limits: DriveLimits) -> Result<(), HalError> {
        Ok(())
    }
}

impl<T: MotorDrive + ?Sized> MotorDrive for Box<T> {
    fn command_relative_move(&mut self, targets: WheelTargets) -> Result<(), HalError> {
        (**self).command_relative_move(targets)
    }

    fn poll_mileage(&mut self) -> Result<Mileage, HalError> {
        (**self).poll_mileage()
    }

    fn stop(&mut self) -> Result<(), HalError> {
        (**self).stop()
    }

    fn set_limits(&mut self, limits: DriveLimits) -> Result<(), HalError> {
        (**self).set_limits(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mileage_arithmetic() {
        let start = Mileage::new(100.0, -50.0);
        let end = start.advanced_by(WheelTargets::new(420.0, 420.0));
        assert_eq!(end, Mileage::new(520.0, 370.0));
        assert_eq!(end.since(start), WheelTargets::new(420.0, 420.0));
    }
}
