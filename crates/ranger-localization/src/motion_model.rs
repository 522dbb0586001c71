//! Stochastic motion model for translate and rotate commands.

use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use ranger_kinematics::Pose;

use crate::error::LocalizationError;

/// A nominal motion command, shared by the belief update and the drive dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Motion {
    /// Drive straight ahead by the given distance (cm).
    Translate(f64),
    /// Turn in place by the given angle (rad, counter-clockwise positive).
    Rotate(f64),
}

impl Motion {
    /// The commanded magnitude, in cm or rad.
    pub fn magnitude(&self) -> f64 {
        match self {
            Motion::Translate(d) => *d,
            Motion::Rotate(a) => *a,
        }
    }
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Motion::Translate(d) => write!(f, "translate {:.2} cm", d),
            Motion::Rotate(a) => write!(f, "rotate {:.3} rad", a),
        }
    }
}

/// Process-noise parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionModelConfig {
    /// Relative error on the distance travelled (σ_ES).
    pub distance_sigma: f64,
    /// Heading drift per centimeter travelled, rad/cm (σ_FS).
    pub drift_sigma: f64,
    /// Relative error on a commanded rotation (σ_GS).
    pub rotation_sigma: f64,
}

impl Default for MotionModelConfig {
    fn default() -> Self {
        MotionModelConfig {
            distance_sigma: 0.1,
            drift_sigma: 0.001,
            rotation_sigma: 0.08,
        }
    }
}

impl MotionModelConfig {
    /// A model with all sigmas at zero.
    pub fn noiseless() -> Self {
        MotionModelConfig {
            distance_sigma: 0.0,
            drift_sigma: 0.0,
            rotation_sigma: 0.0,
        }
    }
}

/// Samples noisy successor poses.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionModelConfig,
    distance_noise: Normal<f64>,
    drift_noise: Normal<f64>,
    rotation_noise: Normal<f64>,
}

fn zero_mean(name: &'static str, sigma: f64) -> Result<Normal<f64>, LocalizationError> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(LocalizationError::invalid(name, "must be non-negative and finite"));
    }
    Normal::new(0.0, sigma)
        .map_err(|_| LocalizationError::invalid(name, "must be non-negative and finite"))
}

impl MotionModel {
    /// Builds a motion model, validating every sigma.
    pub fn new(config: MotionModelConfig) -> Result<Self, LocalizationError> {
        Ok(MotionModel {
            config,
            distance_noise: zero_mean("distance_sigma", config.distance_sigma)?,
            drift_noise: zero_mean("drift_sigma", config.drift_sigma)?,
            rotation_noise: zero_mean("rotation_sigma", config.rotation_sigma)?,
        })
    }

    /// The parameters this model was built from.
    pub fn config(&self) -> &MotionModelConfig {
        &self.config
    }

    /// Sample the pose reached after driving `distance` cm from `pose`.
    ///
    /// The distance is scaled by `1 + d` and the heading drifts by `distance · a`,
    /// with `d ~ N(0, σ_ES)` and `a ~ N(0, σ_FS)`.
    pub fn translate<R: Rng + ?Sized>(&self, pose: &Pose, distance: f64, rng: &mut R) -> Pose {
        let d = self.distance_noise.sample(rng);
        let a = self.drift_noise.sample(rng);
        let moved = pose.advanced(distance * (1.0 + d));
        Pose::new(moved.x, moved.y, pose.theta + distance * a)
    }

    /// Sample the pose reached after turning `angle` rad in place.
    ///
    /// The angle is scaled by `1 + g`, `g ~ N(0, σ_GS)`.
    pub fn rotate<R: Rng + ?Sized>(&self, pose: &Pose, angle: f64, rng: &mut R) -> Pose {
        let g = self.rotation_noise.sample(rng);
        pose.rotated(angle * (1.0 + g))
    }

    /// Sample the successor pose for `motion`.
    pub fn apply<R: Rng + ?Sized>(&self, pose: &Pose, motion: Motion, rng: &mut R) -> Pose {
        match motion {
            Motion::Translate(distance) => self.translate(pose, distance, rng),
            Motion::Rotate(angle) => self.rotate(pose, angle, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::{PI, TAU};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_noiseless_translate() {
        let model = MotionModel::new(MotionModelConfig::noiseless()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let pose = model.translate(&Pose::new(84.0, 30.0, 0.0), 20.0, &mut rng);
        assert!((pose.x - 104.0).abs() < EPSILON);
        assert!((pose.y - 30.0).abs() < EPSILON);
        assert!(pose.theta.abs() < EPSILON);
    }

    #[test]
    fn test_noiseless_rotate_wraps() {
        let model = MotionModel::new(MotionModelConfig::noiseless()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let pose = model.rotate(&Pose::new(1.0, 2.0, 0.25), -0.5, &mut rng);
        assert_eq!((pose.x, pose.y), (1.0, 2.0));
        assert!((pose.theta - (TAU - 0.25)).abs() < EPSILON);
    }

    #[test]
    fn test_apply_dispatches() {
        let model = MotionModel::new(MotionModelConfig::noiseless()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let start = Pose::new(0.0, 0.0, PI / 2.0);
        let moved = model.apply(&start, Motion::Translate(10.0), &mut rng);
        assert!((moved.y - 10.0).abs() < EPSILON);
        let turned = model.apply(&start, Motion::Rotate(PI), &mut rng);
        assert!((turned.theta - 1.5 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_noisy_headings_stay_normalized() {
        let model = MotionModel::new(MotionModelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut pose = Pose::new(100.0, 100.0, 0.0);
        for i in 0..500 {
            let motion = if i % 2 == 0 {
                Motion::Rotate(-3.0)
            } else {
                Motion::Translate(1.0)
            };
            pose = model.apply(&pose, motion, &mut rng);
            assert!((0.0..TAU).contains(&pose.theta));
        }
    }

    #[test]
    fn test_translate_noise_scales_with_distance() {
        let model = MotionModel::new(MotionModelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let start = Pose::new(0.0, 0.0, 0.0);
        let n = 2000;
        let mean: f64 = (0..n)
            .map(|_| model.translate(&start, 20.0, &mut rng).x)
            .sum::<f64>()
            / n as f64;
        // σ_ES = 0.1 on 20 cm gives σ = 2 cm per sample; the mean of 2000 is within ~0.05 cm.
        assert!((mean - 20.0).abs() < 0.3, "mean {}", mean);
    }

    #[test]
    fn test_rejects_negative_sigma() {
        let config = MotionModelConfig {
            rotation_sigma: -0.1,
            ..MotionModelConfig::default()
        };
        assert_eq!(
            MotionModel::new(config).err(),
            Some(LocalizationError::InvalidParameter {
                name: "rotation_sigma",
                reason: "must be non-negative and finite"
            })
        );
        let config = MotionModelConfig {
            drift_sigma: f64::INFINITY,
            ..MotionModelConfig::default()
        };
        assert!(MotionModel::new(config).is_err());
    }
}
