//! Capability traits the control loop consumes.

pub mod drive;
pub mod sonar;

pub use drive::{DriveLimits, Mileage, MotorDrive};
pub use sonar::SonarSensor;
