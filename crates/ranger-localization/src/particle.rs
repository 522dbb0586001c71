//! Weighted pose hypotheses and the initial belief they are drawn from.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use ranger_kinematics::Pose;

use crate::error::LocalizationError;

/// A single weighted pose hypothesis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Particle {
    /// Hypothesized robot pose.
    pub pose: Pose,
    /// Non-negative importance weight.
    pub weight: f64,
}

impl Particle {
    /// Creates a particle.
    pub fn new(pose: Pose, weight: f64) -> Self {
        Particle { pose, weight }
    }
}

/// How the particle set is seeded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum InitialBelief {
    /// All particles at one known pose.
    Known(Pose),
    /// Particles drawn around `mean` with independent Gaussian position and heading noise.
    Gaussian {
        /// Center of the belief.
        mean: Pose,
        /// Standard deviation of x and y (cm).
        sigma_xy: f64,
        /// Standard deviation of the heading (rad).
        sigma_theta: f64,
    },
}

impl InitialBelief {
    /// The center of the belief.
    pub fn mean(&self) -> Pose {
        match self {
            InitialBelief::Known(pose) => *pose,
            InitialBelief::Gaussian { mean, .. } => *mean,
        }
    }

    /// Draw `count` particles with uniform weight `1 / count`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Particle>, LocalizationError> {
        if count == 0 {
            return Err(LocalizationError::invalid("num_particles", "must be at least 1"));
        }
        let weight = 1.0 / count as f64;
        match *self {
            InitialBelief::Known(pose) => Ok(vec![Particle::new(pose, weight); count]),
            InitialBelief::Gaussian {
                mean,
                sigma_xy,
                sigma_theta,
            } => {
                let position = Normal::new(0.0, sigma_xy).map_err(|_| {
                    LocalizationError::invalid("sigma_xy", "must be non-negative and finite")
                })?;
                let heading = Normal::new(0.0, sigma_theta).map_err(|_| {
                    LocalizationError::invalid("sigma_theta", "must be non-negative and finite")
                })?;
                Ok((0..count)
                    .map(|_| {
                        let pose = Pose::new(
                            mean.x + position.sample(rng),
                            mean.y + position.sample(rng),
                            mean.theta + heading.sample(rng),
                        );
                        Particle::new(pose, weight)
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::TAU;

    #[test]
    fn test_known_belief_is_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let pose = Pose::new(84.0, 30.0, 0.0);
        let particles = InitialBelief::Known(pose).sample(114, &mut rng).unwrap();
        assert_eq!(particles.len(), 114);
        assert!(particles.iter().all(|p| p.pose == pose));
        let total: f64 = particles.iter().map(|p| p.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_belief_spreads() {
        let mut rng = StdRng::seed_from_u64(42);
        let belief = InitialBelief::Gaussian {
            mean: Pose::new(84.0, 30.0, 0.0),
            sigma_xy: 3.0,
            sigma_theta: 0.1,
        };
        let particles = belief.sample(500, &mut rng).unwrap();
        assert!(particles.iter().any(|p| p.pose.x != 84.0));
        assert!(particles.iter().all(|p| (0.0..TAU).contains(&p.pose.theta)));
        let mean_x = particles.iter().map(|p| p.pose.x).sum::<f64>() / 500.0;
        assert!((mean_x - 84.0).abs() < 1.0);
    }

    #[test]
    fn test_invalid_belief() {
        let mut rng = StdRng::seed_from_u64(42);
        let pose = Pose::default();
        assert!(InitialBelief::Known(pose).sample(0, &mut rng).is_err());
        let belief = InitialBelief::Gaussian {
            mean: pose,
            sigma_xy: -1.0,
            sigma_theta: 0.1,
        };
        assert!(belief.sample(10, &mut rng).is_err());
    }
}
