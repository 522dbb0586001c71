#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for planar pose math and differential-drive calibration."]
#![doc = ""]
#![doc = "This crate provides the pose type shared by the localization and navigation crates,"]
#![doc = "heading normalization, and the conversion between commanded motions and wheel drive units."]

use core::f64::consts::{PI, TAU};
use core::fmt;
use libm::{atan2, cos, fabs, sin, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Normalize an angle to be within `[0, 2π)`.
///
/// Values that round up to exactly `2π` after wrapping are folded back to `0`.
///
/// # Arguments
///
/// * `angle`: The angle in radians to normalize.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    let a = if a < 0.0 { a + TAU } else { a };
    if a >= TAU { 0.0 } else { a }
}

/// Signed minimal rotation that takes heading `from` onto heading `to`.
///
/// The result lies in `(-π, π]`; positive values are counter-clockwise.
pub fn shortest_turn(from: f64, to: f64) -> f64 {
    let delta = normalize_angle(to - from);
    if delta > PI { delta - TAU } else { delta }
}

/// A point `(x, y)` in the map frame, in centimeters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Map-frame x coordinate (cm).
    pub x: f64,
    /// Map-frame y coordinate (cm).
    pub y: f64,
}

impl Point {
    /// Construct a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        sqrt(dx * dx + dy * dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A 2‑D pose `(x, y, θ)` in centimeters and radians (θ measured counter‑clockwise
/// from the x‑axis in the map frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Map‑frame x position (cm).
    pub x: f64,
    /// Map‑frame y position (cm).
    pub y: f64,
    /// Heading (rad), normalized to `[0, 2π)`.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose, normalizing the heading to `[0, 2π)`.
    ///
    /// # Arguments
    ///
    /// * `x`: Map-frame x position in centimeters.
    /// * `y`: Map-frame y position in centimeters.
    /// * `theta`: Heading in radians.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// The position part of the pose.
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Straight-line distance from this pose to `target`.
    pub fn distance_to(&self, target: Point) -> f64 {
        self.position().distance_to(target)
    }

    /// Absolute bearing from this pose to `target`, in `[0, 2π)`.
    pub fn bearing_to(&self, target: Point) -> f64 {
        normalize_angle(atan2(target.y - self.y, target.x - self.x))
    }

    /// Signed minimal turn that makes this pose face `target`.
    pub fn turn_towards(&self, target: Point) -> f64 {
        shortest_turn(self.theta, self.bearing_to(target))
    }

    /// The pose reached by driving `distance` centimeters along the current heading.
    pub fn advanced(&self, distance: f64) -> Pose {
        Pose {
            x: self.x + distance * cos(self.theta),
            y: self.y + distance * sin(self.theta),
            theta: self.theta,
        }
    }

    /// The pose reached by turning in place by `angle` radians.
    pub fn rotated(&self, angle: f64) -> Pose {
        Pose::new(self.x, self.y, self.theta + angle)
    }

    /// Integrate a body-frame motion.
    ///
    /// Uses the midpoint heading so that a motion with both a translation and a
    /// rotation component follows a chord of the arc.
    pub fn integrate(&self, motion: BodyMotion) -> Pose {
        let mid = self.theta + motion.rotation / 2.0;
        Pose::new(
            self.x + motion.distance * cos(mid),
            self.y + motion.distance * sin(mid),
            self.theta + motion.rotation,
        )
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.3} rad)", self.x, self.y, self.theta)
    }
}

/// Relative wheel targets, in drive units (encoder degrees).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelTargets {
    /// Left wheel increment.
    pub left: f64,
    /// Right wheel increment.
    pub right: f64,
}

impl WheelTargets {
    /// Construct wheel targets.
    pub const fn new(left: f64, right: f64) -> Self {
        WheelTargets { left, right }
    }

    /// Largest absolute increment of the two wheels.
    pub fn magnitude(&self) -> f64 {
        let l = fabs(self.left);
        let r = fabs(self.right);
        if l > r { l } else { r }
    }
}

impl fmt::Display for WheelTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L: {:.1}, R: {:.1})", self.left, self.right)
    }
}

/// A body-frame motion: forward distance and counter-clockwise rotation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyMotion {
    /// Distance travelled by the chassis center (cm).
    pub distance: f64,
    /// Rotation of the chassis (rad).
    pub rotation: f64,
}

impl BodyMotion {
    /// Construct a body motion.
    pub const fn new(distance: f64, rotation: f64) -> Self {
        BodyMotion { distance, rotation }
    }
}

/// Differential‑drive calibration.
///
/// Maps commanded chassis motions onto relative wheel targets. A positive
/// (counter-clockwise) rotation drives the right wheel forward and the left
/// wheel backward.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCalibration {
    /// Drive units per centimeter of straight travel.
    units_per_cm: f64,
    /// Drive units per radian of in-place rotation, per wheel.
    units_per_radian: f64,
}

impl DriveCalibration {
    /// Construct a calibration from measured scale factors.
    ///
    /// # Arguments
    ///
    /// * `units_per_cm`: Wheel drive units for one centimeter of straight travel.
    /// * `units_per_radian`: Wheel drive units (per wheel, opposite signs) for one radian of in-place rotation.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidLinearScale)` if `units_per_cm` is not positive.
    /// Returns `Err(KinematicsError::InvalidAngularScale)` if `units_per_radian` is not positive.
    pub const fn new(units_per_cm: f64, units_per_radian: f64) -> Result<Self, KinematicsError> {
        if !(units_per_cm > 0.0) || units_per_cm == f64::INFINITY {
            return Err(KinematicsError::InvalidLinearScale(
                "must be positive and finite",
            ));
        }
        if !(units_per_radian > 0.0) || units_per_radian == f64::INFINITY {
            return Err(KinematicsError::InvalidAngularScale(
                "must be positive and finite",
            ));
        }
        Ok(DriveCalibration {
            units_per_cm,
            units_per_radian,
        })
    }

    /// Derive a calibration from wheel geometry.
    ///
    /// # Arguments
    ///
    /// * `wheel_radius`: The radius of the drive wheels in centimeters.
    /// * `axle_length`: The distance between the two wheel contact points in centimeters.
    /// * `units_per_wheel_radian`: Drive units reported per radian of wheel rotation.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidGeometry)` if either length is not positive,
    /// or the scale errors of [`DriveCalibration::new`].
    pub fn from_wheel_geometry(
        wheel_radius: f64,
        axle_length: f64,
        units_per_wheel_radian: f64,
    ) -> Result<Self, KinematicsError> {
        if !(wheel_radius > 0.0) {
            return Err(KinematicsError::InvalidGeometry("wheel radius must be positive"));
        }
        if !(axle_length > 0.0) {
            return Err(KinematicsError::InvalidGeometry("axle length must be positive"));
        }
        // A wheel travelling `r·φ` cm per `φ` radians; in-place rotation moves each
        // wheel along an arc of radius `axle_length / 2`.
        let units_per_cm = units_per_wheel_radian / wheel_radius;
        let units_per_radian = units_per_wheel_radian * (axle_length / 2.0) / wheel_radius;
        Self::new(units_per_cm, units_per_radian)
    }

    /// Returns the drive units per centimeter.
    pub fn units_per_cm(&self) -> f64 {
        self.units_per_cm
    }

    /// Returns the drive units per radian.
    pub fn units_per_radian(&self) -> f64 {
        self.units_per_radian
    }

    /// Wheel targets for a straight translation of `distance` centimeters.
    pub fn translation(&self, distance: f64) -> WheelTargets {
        let units = distance * self.units_per_cm;
        WheelTargets::new(units, units)
    }

    /// Wheel targets for an in-place rotation of `angle` radians.
    pub fn rotation(&self, angle: f64) -> WheelTargets {
        let units = angle * self.units_per_radian;
        WheelTargets::new(-units, units)
    }

    /// Recover the body motion produced by a pair of wheel increments.
    ///
    /// This is the inverse of [`translation`](Self::translation) and
    /// [`rotation`](Self::rotation) and their sum.
    pub fn odometry(&self, delta: WheelTargets) -> BodyMotion {
        let common = (delta.left + delta.right) / 2.0;
        let differential = (delta.right - delta.left) / 2.0;
        BodyMotion::new(common / self.units_per_cm, differential / self.units_per_radian)
    }
}

impl Default for DriveCalibration {
    /// The calibration measured on the reference rig: 21 units/cm and 170 units/rad.
    fn default() -> Self {
        DriveCalibration {
            units_per_cm: 21.0,
            units_per_radian: 170.0,
        }
    }
}

impl fmt::Display for DriveCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DriveCalibration ({:.2} units/cm, {:.2} units/rad)",
            self.units_per_cm, self.units_per_radian
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_angle_normalization() {
        assert!((normalize_angle(0.0) - 0.0).abs() < EPSILON);
        assert!((normalize_angle(TAU) - 0.0).abs() < EPSILON);
        assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < EPSILON);
        assert!((normalize_angle(5.0 * PI) - PI).abs() < EPSILON);
        assert!((normalize_angle(-4.5 * PI) - 1.5 * PI).abs() < EPSILON);
        // A tiny negative angle must not round up to exactly 2π.
        let wrapped = normalize_angle(-1e-18);
        assert!((0.0..TAU).contains(&wrapped));
    }

    #[test]
    fn test_shortest_turn() {
        assert!((shortest_turn(0.0, PI / 2.0) - PI / 2.0).abs() < EPSILON);
        assert!((shortest_turn(PI / 2.0, 0.0) + PI / 2.0).abs() < EPSILON);
        // Across the wrap boundary the short way round is taken.
        assert!((shortest_turn(0.1, TAU - 0.1) + 0.2).abs() < EPSILON);
        assert!((shortest_turn(TAU - 0.1, 0.1) - 0.2).abs() < EPSILON);
        assert!((shortest_turn(0.0, PI) - PI).abs() < EPSILON);
    }

    #[test]
    fn test_pose_new_normalizes_heading() {
        let pose = Pose::new(1.0, 2.0, -PI / 2.0);
        assert!((pose.theta - 1.5 * PI).abs() < EPSILON);
        assert_eq!(pose.position(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_bearing_and_turn() {
        let pose = Pose::new(84.0, 30.0, 0.0);
        let ahead = Point::new(180.0, 30.0);
        assert!(pose.bearing_to(ahead).abs() < EPSILON);
        assert!(pose.turn_towards(ahead).abs() < EPSILON);
        assert!((pose.distance_to(ahead) - 96.0).abs() < EPSILON);

        let below = Point::new(84.0, 0.0);
        assert!((pose.bearing_to(below) - 1.5 * PI).abs() < EPSILON);
        assert!((pose.turn_towards(below) + PI / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_advanced_and_rotated() {
        let pose = Pose::new(1.0, 1.0, PI / 2.0);
        let moved = pose.advanced(2.0);
        assert!((moved.x - 1.0).abs() < EPSILON);
        assert!((moved.y - 3.0).abs() < EPSILON);
        let turned = pose.rotated(PI);
        assert!((turned.theta - 1.5 * PI).abs() < EPSILON);
        assert_eq!(turned.position(), pose.position());
    }

    #[test]
    fn test_integrate_pure_motions() {
        let pose = Pose::new(0.0, 0.0, 0.0);
        let straight = pose.integrate(BodyMotion::new(10.0, 0.0));
        assert!((straight.x - 10.0).abs() < EPSILON);
        assert!(straight.y.abs() < EPSILON);
        let spun = pose.integrate(BodyMotion::new(0.0, PI / 2.0));
        assert!(spun.x.abs() < EPSILON && spun.y.abs() < EPSILON);
        assert!((spun.theta - PI / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_calibration_constructor() {
        let calibration = DriveCalibration::new(21.0, 170.0).unwrap();
        assert_eq!(calibration.units_per_cm(), 21.0);
        assert_eq!(calibration.units_per_radian(), 170.0);
        assert_eq!(calibration, DriveCalibration::default());
    }

    #[test]
    fn test_calibration_invalid_scales() {
        assert!(matches!(
            DriveCalibration::new(0.0, 170.0),
            Err(KinematicsError::InvalidLinearScale(_))
        ));
        assert!(matches!(
            DriveCalibration::new(21.0, -1.0),
            Err(KinematicsError::InvalidAngularScale(_))
        ));
        assert!(matches!(
            DriveCalibration::new(f64::NAN, 170.0),
            Err(KinematicsError::InvalidLinearScale(_))
        ));
        assert!(matches!(
            DriveCalibration::from_wheel_geometry(0.0, 12.0, 57.3),
            Err(KinematicsError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_translation_targets() {
        let calibration = DriveCalibration::default();
        let targets = calibration.translation(20.0);
        // 20 cm at 21 units/cm
        assert!((targets.left - 420.0).abs() < EPSILON);
        assert!((targets.right - 420.0).abs() < EPSILON);
    }

    #[test]
    fn test_rotation_targets() {
        let calibration = DriveCalibration::default();
        let targets = calibration.rotation(PI / 2.0);
        assert!((targets.right - 170.0 * PI / 2.0).abs() < EPSILON);
        assert!((targets.left + 170.0 * PI / 2.0).abs() < EPSILON);
        assert!((targets.magnitude() - 170.0 * PI / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_odometry_inverts_targets() {
        let calibration = DriveCalibration::default();
        let motion = calibration.odometry(calibration.translation(12.5));
        assert!((motion.distance - 12.5).abs() < EPSILON);
        assert!(motion.rotation.abs() < EPSILON);

        let motion = calibration.odometry(calibration.rotation(-0.75));
        assert!(motion.distance.abs() < EPSILON);
        assert!((motion.rotation + 0.75).abs() < EPSILON);
    }

    #[test]
    fn test_calibration_from_wheel_geometry() {
        // r = 2.8 cm, L = 11.2 cm, 180/π units per wheel radian (encoder degrees)
        let units_per_wheel_radian = 180.0 / PI;
        let calibration =
            DriveCalibration::from_wheel_geometry(2.8, 11.2, units_per_wheel_radian).unwrap();
        assert!((calibration.units_per_cm() - units_per_wheel_radian / 2.8).abs() < EPSILON);
        assert!(
            (calibration.units_per_radian() - units_per_wheel_radian * 5.6 / 2.8).abs() < EPSILON
        );
    }
}
