#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines the errors raised when a drive calibration is built
//! from physically meaningless parameters.

use core::fmt;

/// Errors that can occur while building a drive calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for an invalid linear scale.
    /// Returned when the drive-units-per-centimeter factor is not a positive finite number.
    InvalidLinearScale(&'static str),
    /// Error for an invalid angular scale.
    /// Returned when the drive-units-per-radian factor is not a positive finite number.
    InvalidAngularScale(&'static str),
    /// Error for invalid wheel geometry.
    /// Returned when a wheel radius or axle length is not positive.
    InvalidGeometry(&'static str),
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidLinearScale(msg) => write!(f, "Invalid linear scale: {}", msg),
            KinematicsError::InvalidAngularScale(msg) => {
                write!(f, "Invalid angular scale: {}", msg)
            }
            KinematicsError::InvalidGeometry(msg) => write!(f, "Invalid wheel geometry: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
