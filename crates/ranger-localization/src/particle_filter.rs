//! Monte Carlo localization over a fixed-size particle set.
//!
//! The filter alternates three steps driven by the navigator:
//!
//! 1. [`ParticleFilter::motion_update`] moves every particle through the
//!    motion model after a physical move. Weights are untouched.
//! 2. [`ParticleFilter::sensor_update`] re-weights particles by how well they
//!    explain a sonar range. Particles facing out of the map are dropped.
//! 3. [`ParticleFilter::resample`] draws the set back to exactly `N`
//!    particles with uniform weight.
//!
//! [`ParticleFilter::estimate_pose`] reads the weighted mean at any time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ranger_kinematics::Pose;
use tracing::{debug, warn};

use crate::error::LocalizationError;
use crate::map::WallMap;
use crate::motion_model::{Motion, MotionModel};
use crate::particle::{InitialBelief, Particle};
use crate::range_model::RangeModel;
use crate::stats;

/// Resampling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResamplingStrategy {
    /// `N` independent draws proportional to weight.
    #[default]
    Multinomial,
    /// Low-variance resampling: one random offset, `N` evenly spaced pointers.
    Systematic,
}

/// Particle filter configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParticleFilterConfig {
    /// Number of particles after every resample.
    pub num_particles: usize,
    /// Resampling scheme.
    pub resampling: ResamplingStrategy,
    /// RNG seed; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 114,
            resampling: ResamplingStrategy::default(),
            seed: None,
        }
    }
}

/// Counters of filter activity since construction or the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStats {
    /// Motion updates applied.
    pub motion_updates: u64,
    /// Sensor updates that succeeded.
    pub sensor_updates: u64,
    /// Sensor updates rejected for degeneracy.
    pub degeneracies: u64,
    /// Resamples performed.
    pub resamples: u64,
}

/// Outcome of a successful sensor update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorUpdateReport {
    /// Particles that had a ray solution and were kept.
    pub survivors: usize,
    /// Particles dropped for facing out of the map.
    pub discarded: usize,
    /// Effective sample size of the re-weighted set.
    pub effective_sample_size: f64,
}

/// Weighted spread of the particle set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseSpread {
    /// Standard deviation of x (cm).
    pub sigma_x: f64,
    /// Standard deviation of y (cm).
    pub sigma_y: f64,
    /// Circular standard deviation of the heading (rad).
    pub sigma_theta: f64,
}

/// Particle filter for sonar localization against a [`WallMap`].
#[derive(Debug, Clone)]
pub struct ParticleFilter {
    config: ParticleFilterConfig,
    particles: Vec<Particle>,
    motion: MotionModel,
    range: RangeModel,
    rng: StdRng,
    stats: FilterStats,
}

impl ParticleFilter {
    /// Creates a filter and seeds its particles from `belief`.
    ///
    /// # Arguments
    /// * `config` - Particle count, resampling scheme and seed.
    /// * `belief` - Initial belief the particles are drawn from.
    /// * `motion` - Motion model applied on every motion update.
    /// * `range` - Measurement model applied on every sensor update.
    ///
    /// # Returns
    /// * `Err(LocalizationError::InvalidParameter)` if `num_particles` is zero or the belief is invalid.
    pub fn new(
        config: ParticleFilterConfig,
        belief: InitialBelief,
        motion: MotionModel,
        range: RangeModel,
    ) -> Result<Self, LocalizationError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let particles = belief.sample(config.num_particles, &mut rng)?;
        debug!(
            particles = config.num_particles,
            strategy = ?config.resampling,
            "Particle filter initialized"
        );
        Ok(Self {
            config,
            particles,
            motion,
            range,
            rng,
            stats: FilterStats::default(),
        })
    }

    /// Re-seed the particle set from `belief` and clear the counters.
    pub fn reset(&mut self, belief: InitialBelief) -> Result<(), LocalizationError> {
        self.particles = belief.sample(self.config.num_particles, &mut self.rng)?;
        self.stats = FilterStats::default();
        debug!(mean = %belief.mean(), "Particle filter reset");
        Ok(())
    }

    /// Apply `motion` to every particle. Weights are not touched.
    pub fn motion_update(&mut self, motion: Motion) {
        for particle in self.particles.iter_mut() {
            particle.pose = self.motion.apply(&particle.pose, motion, &mut self.rng);
        }
        self.stats.motion_updates += 1;
    }

    /// Re-weight the particles by the likelihood of `observed` and renormalize.
    ///
    /// Particles without a ray solution are removed until the next resample.
    ///
    /// # Returns
    /// * `Err(LocalizationError::FilterDegeneracy)` when no particle survives; the set is unchanged.
    /// * `Err(LocalizationError::InvalidParameter)` when `observed` is not finite.
    pub fn sensor_update(
        &mut self,
        map: &WallMap,
        observed: f64,
    ) -> Result<SensorUpdateReport, LocalizationError> {
        if !observed.is_finite() {
            return Err(LocalizationError::invalid("observed", "range must be finite"));
        }
        let before = self.particles.len();
        let mut survivors: Vec<Particle> = self
            .particles
            .iter()
            .filter_map(|p| {
                self.range
                    .score(map, &p.pose, observed)
                    .map(|likelihood| Particle::new(p.pose, p.weight * likelihood))
            })
            .collect();

        let total = stats::normalize_weights(&mut survivors);
        if survivors.is_empty() || !(total > 0.0 && total.is_finite()) {
            self.stats.degeneracies += 1;
            warn!(particles = before, observed, "No particle can explain the range reading");
            return Err(LocalizationError::FilterDegeneracy {
                particles: before,
                observed,
            });
        }

        let report = SensorUpdateReport {
            survivors: survivors.len(),
            discarded: before - survivors.len(),
            effective_sample_size: stats::effective_sample_size(&survivors),
        };
        if report.discarded > 0 {
            warn!(
                discarded = report.discarded,
                survivors = report.survivors,
                "Dropped particles facing out of the map"
            );
        }
        debug!(
            observed,
            ess = report.effective_sample_size,
            "Sensor update applied"
        );
        self.particles = survivors;
        self.stats.sensor_updates += 1;
        Ok(report)
    }

    /// Draw the set back to exactly `num_particles` particles of weight `1 / N`.
    pub fn resample(&mut self) {
        let n = self.config.num_particles;
        let cumulative = stats::cumulative_weights(&self.particles);
        let total = cumulative.last().copied().unwrap_or(0.0);
        if self.particles.is_empty() || !(total > 0.0) {
            warn!("Resample skipped: particle weights sum to zero");
            return;
        }
        let last = self.particles.len() - 1;
        let weight = 1.0 / n as f64;

        let drawn: Vec<Particle> = match self.config.resampling {
            ResamplingStrategy::Multinomial => (0..n)
                .map(|_| {
                    let u = self.rng.random::<f64>() * total;
                    let idx = cumulative.partition_point(|&c| c <= u).min(last);
                    Particle::new(self.particles[idx].pose, weight)
                })
                .collect(),
            ResamplingStrategy::Systematic => {
                let step = total / n as f64;
                let offset = self.rng.random::<f64>() * step;
                let mut idx = 0;
                (0..n)
                    .map(|i| {
                        let u = offset + i as f64 * step;
                        while idx < last && cumulative[idx] <= u {
                            idx += 1;
                        }
                        Particle::new(self.particles[idx].pose, weight)
                    })
                    .collect()
            }
        };

        self.particles = drawn;
        self.stats.resamples += 1;
    }

    /// Weighted mean position and weighted circular mean heading.
    pub fn estimate_pose(&self) -> Pose {
        let total = stats::total_weight(&self.particles);
        let uniform = !(total > 0.0);
        let weight_of = |p: &Particle| if uniform { 1.0 } else { p.weight };
        let norm = if uniform {
            self.particles.len().max(1) as f64
        } else {
            total
        };

        let (sx, sy) = self.particles.iter().fold((0.0, 0.0), |(sx, sy), p| {
            let w = weight_of(p);
            (sx + w * p.pose.x, sy + w * p.pose.y)
        });
        let theta =
            stats::circular_mean(self.particles.iter().map(|p| (p.pose.theta, weight_of(p))));
        Pose::new(sx / norm, sy / norm, theta)
    }

    /// Weighted standard deviation of the particle poses.
    pub fn spread(&self) -> PoseSpread {
        let mean = self.estimate_pose();
        let total = stats::total_weight(&self.particles);
        if !(total > 0.0) {
            return PoseSpread::default();
        }
        let (vx, vy) = self.particles.iter().fold((0.0, 0.0), |(vx, vy), p| {
            let dx = p.pose.x - mean.x;
            let dy = p.pose.y - mean.y;
            (vx + p.weight * dx * dx, vy + p.weight * dy * dy)
        });
        PoseSpread {
            sigma_x: (vx / total).sqrt(),
            sigma_y: (vy / total).sqrt(),
            sigma_theta: stats::circular_std(
                self.particles.iter().map(|p| (p.pose.theta, p.weight)),
            ),
        }
    }

    /// Effective sample size of the current weights.
    pub fn effective_sample_size(&self) -> f64 {
        stats::effective_sample_size(&self.particles)
    }

    /// Current particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Configuration the filter was built with.
    pub fn config(&self) -> &ParticleFilterConfig {
        &self.config
    }

    /// Activity counters.
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// The motion model.
    pub fn motion_model(&self) -> &MotionModel {
        &self.motion
    }

    /// The measurement model.
    pub fn range_model(&self) -> &RangeModel {
        &self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Wall;
    use crate::motion_model::MotionModelConfig;
    use crate::range_model::cast_ray;
    use ranger_kinematics::shortest_turn;
    use std::f64::consts::{PI, TAU};

    const EPSILON: f64 = 1e-9;

    fn config(strategy: ResamplingStrategy) -> ParticleFilterConfig {
        ParticleFilterConfig {
            num_particles: 114,
            resampling: strategy,
            seed: Some(42),
        }
    }

    fn spread_filter(strategy: ResamplingStrategy) -> ParticleFilter {
        ParticleFilter::new(
            config(strategy),
            InitialBelief::Gaussian {
                mean: Pose::new(84.0, 30.0, 0.0),
                sigma_xy: 5.0,
                sigma_theta: 0.2,
            },
            MotionModel::new(MotionModelConfig::default()).unwrap(),
            RangeModel::default(),
        )
        .unwrap()
    }

    fn weight_sum(filter: &ParticleFilter) -> f64 {
        filter.particles().iter().map(|p| p.weight).sum()
    }

    #[test]
    fn test_zero_particles_rejected() {
        let result = ParticleFilter::new(
            ParticleFilterConfig {
                num_particles: 0,
                ..ParticleFilterConfig::default()
            },
            InitialBelief::Known(Pose::default()),
            MotionModel::new(MotionModelConfig::default()).unwrap(),
            RangeModel::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_then_resample_restores_invariants() {
        for strategy in [ResamplingStrategy::Multinomial, ResamplingStrategy::Systematic] {
            let mut filter = spread_filter(strategy);
            let map = WallMap::arena();
            let report = filter.sensor_update(&map, 126.0).unwrap();
            assert_eq!(report.survivors + report.discarded, 114);
            assert!((weight_sum(&filter) - 1.0).abs() < EPSILON);

            filter.resample();
            assert_eq!(filter.particles().len(), 114);
            assert!((weight_sum(&filter) - 1.0).abs() < EPSILON);
            assert!(filter
                .particles()
                .iter()
                .all(|p| (p.weight - 1.0 / 114.0).abs() < EPSILON));
            assert!(filter
                .particles()
                .iter()
                .all(|p| (0.0..TAU).contains(&p.pose.theta)));
        }
    }

    #[test]
    fn test_particles_without_solution_are_dropped() {
        // A single wall to the east: particles facing west see nothing.
        let map = WallMap::new(vec![Wall::vertical(100.0, 0.0, 100.0)]).unwrap();
        let mut filter = ParticleFilter::new(
            config(ResamplingStrategy::Multinomial),
            InitialBelief::Known(Pose::new(50.0, 50.0, 0.0)),
            MotionModel::new(MotionModelConfig::noiseless()).unwrap(),
            RangeModel::default(),
        )
        .unwrap();
        filter.particles[..14]
            .iter_mut()
            .for_each(|p| p.pose = Pose::new(50.0, 50.0, PI));

        let report = filter.sensor_update(&map, 50.0).unwrap();
        assert_eq!(report.discarded, 14);
        assert_eq!(report.survivors, 100);
        assert_eq!(filter.particles().len(), 100);
        assert!((weight_sum(&filter) - 1.0).abs() < EPSILON);

        filter.resample();
        assert_eq!(filter.particles().len(), 114);
        assert!(filter.particles().iter().all(|p| p.pose.theta == 0.0));
    }

    #[test]
    fn test_degeneracy_leaves_set_untouched() {
        let map = WallMap::new(vec![Wall::vertical(100.0, 0.0, 100.0)]).unwrap();
        let mut filter = ParticleFilter::new(
            config(ResamplingStrategy::Multinomial),
            InitialBelief::Known(Pose::new(50.0, 50.0, PI)),
            MotionModel::new(MotionModelConfig::noiseless()).unwrap(),
            RangeModel::default(),
        )
        .unwrap();
        let before = filter.particles().to_vec();

        let result = filter.sensor_update(&map, 50.0);
        assert_eq!(
            result,
            Err(LocalizationError::FilterDegeneracy {
                particles: 114,
                observed: 50.0
            })
        );
        assert_eq!(filter.particles(), &before[..]);
        assert_eq!(filter.stats().degeneracies, 1);
        assert_eq!(filter.stats().sensor_updates, 0);
    }

    #[test]
    fn test_estimate_identical_poses_ignores_weights() {
        let pose = Pose::new(84.0, 30.0, 1.25);
        let mut filter = ParticleFilter::new(
            config(ResamplingStrategy::Multinomial),
            InitialBelief::Known(pose),
            MotionModel::new(MotionModelConfig::default()).unwrap(),
            RangeModel::default(),
        )
        .unwrap();
        for (i, p) in filter.particles.iter_mut().enumerate() {
            p.weight = (i + 1) as f64;
        }
        let estimate = filter.estimate_pose();
        assert!((estimate.x - pose.x).abs() < EPSILON);
        assert!((estimate.y - pose.y).abs() < EPSILON);
        assert!((estimate.theta - pose.theta).abs() < EPSILON);
    }

    #[test]
    fn test_estimate_heading_wraps_around_zero() {
        let mut filter = spread_filter(ResamplingStrategy::Multinomial);
        for (i, p) in filter.particles.iter_mut().enumerate() {
            let theta = if i % 2 == 0 { 0.05 } else { TAU - 0.05 };
            p.pose = Pose::new(10.0, 10.0, theta);
        }
        let estimate = filter.estimate_pose();
        assert!(estimate.theta < 1e-6 || TAU - estimate.theta < 1e-6);
    }

    #[test]
    fn test_resampling_converged_set_is_stable() {
        let mut filter = ParticleFilter::new(
            config(ResamplingStrategy::Multinomial),
            InitialBelief::Gaussian {
                mean: Pose::new(84.0, 30.0, 0.0),
                sigma_xy: 0.5,
                sigma_theta: 0.01,
            },
            MotionModel::new(MotionModelConfig::default()).unwrap(),
            RangeModel::default(),
        )
        .unwrap();
        let distinct = filter
            .particles()
            .iter()
            .any(|p| p.pose != filter.particles()[0].pose);
        assert!(distinct);

        let before = filter.estimate_pose();
        // One 20 cm step with 0.1 relative distance noise has a 2 cm sigma.
        let step_sigma = 0.1 * 20.0;
        for _ in 0..10 {
            filter.resample();
            let after = filter.estimate_pose();
            assert!(
                before.distance_to(after.position()) < step_sigma,
                "drifted to {}",
                after
            );
            assert!(shortest_turn(before.theta, after.theta).abs() < 0.08);
        }
    }

    #[test]
    fn test_motion_update_keeps_weights() {
        let mut filter = spread_filter(ResamplingStrategy::Systematic);
        filter.sensor_update(&WallMap::arena(), 126.0).unwrap();
        let weights: Vec<f64> = filter.particles().iter().map(|p| p.weight).collect();
        filter.motion_update(Motion::Translate(20.0));
        filter.motion_update(Motion::Rotate(-PI / 3.0));
        let after: Vec<f64> = filter.particles().iter().map(|p| p.weight).collect();
        assert_eq!(weights, after);
        assert_eq!(filter.stats().motion_updates, 2);
        assert!(filter
            .particles()
            .iter()
            .all(|p| (0.0..TAU).contains(&p.pose.theta)));
    }

    #[test]
    fn test_localization_pulls_estimate_toward_truth() {
        let map = WallMap::arena();
        let truth = Pose::new(84.0, 30.0, 0.0);
        let mut filter = ParticleFilter::new(
            ParticleFilterConfig {
                num_particles: 500,
                resampling: ResamplingStrategy::Systematic,
                seed: Some(42),
            },
            InitialBelief::Gaussian {
                mean: Pose::new(90.0, 30.0, 0.0),
                sigma_xy: 8.0,
                sigma_theta: 0.02,
            },
            MotionModel::new(MotionModelConfig::default()).unwrap(),
            RangeModel::default(),
        )
        .unwrap();
        let observed = cast_ray(&map, &truth).unwrap();
        for _ in 0..3 {
            filter.sensor_update(&map, observed).unwrap();
            filter.resample();
        }
        // Heading east, the range only constrains x.
        let estimate = filter.estimate_pose();
        assert!((estimate.x - truth.x).abs() < 3.0, "estimate {}", estimate);
        assert!(filter.spread().sigma_x < 4.0);
    }

    #[test]
    fn test_reset_reseeds() {
        let mut filter = spread_filter(ResamplingStrategy::Multinomial);
        filter.motion_update(Motion::Translate(10.0));
        filter.reset(InitialBelief::Known(Pose::new(1.0, 2.0, 3.0))).unwrap();
        assert_eq!(filter.particles().len(), 114);
        assert_eq!(filter.stats(), FilterStats::default());
        let estimate = filter.estimate_pose();
        assert!((estimate.x - 1.0).abs() < EPSILON);
        assert!((filter.effective_sample_size() - 114.0).abs() < 1e-6);
    }
}
