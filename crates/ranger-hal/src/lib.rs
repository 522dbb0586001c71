//! Hardware abstraction for the ranger robot.
//!
//! The control loop only sees the [`MotorDrive`] and [`SonarSensor`] traits.
//! Every physical move goes through a [`MotionGuard`], which stops the drive
//! on any path where the move is not seen to complete.

pub mod error;
pub mod estop;
pub mod motion;
pub mod traits;

pub use error::HalError;
pub use estop::EmergencyStop;
pub use motion::{MotionGuard, execute_move};
pub use traits::{DriveLimits, Mileage, MotorDrive, SonarSensor};
