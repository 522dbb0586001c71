//! Sonar Monte Carlo localization.
//!
//! The robot's belief is a set of weighted [`Particle`]s. Commanded motions
//! move them through a noisy [`MotionModel`]; each sonar range re-weights them
//! by comparing it with the range a [`RangeModel`] predicts by casting a ray
//! against the [`WallMap`].
//!
//! ```
//! use ranger_kinematics::Pose;
//! use ranger_localization::{
//!     InitialBelief, Motion, MotionModel, MotionModelConfig, ParticleFilter,
//!     ParticleFilterConfig, RangeModel, WallMap,
//! };
//!
//! let map = WallMap::arena();
//! let mut filter = ParticleFilter::new(
//!     ParticleFilterConfig { seed: Some(7), ..Default::default() },
//!     InitialBelief::Known(Pose::new(84.0, 30.0, 0.0)),
//!     MotionModel::new(MotionModelConfig::default())?,
//!     RangeModel::default(),
//! )?;
//!
//! filter.motion_update(Motion::Translate(20.0));
//! filter.sensor_update(&map, 106.0)?;
//! filter.resample();
//! let estimate = filter.estimate_pose();
//! assert!((estimate.x - 104.0).abs() < 5.0);
//! # Ok::<(), ranger_localization::LocalizationError>(())
//! ```

pub mod error;
pub mod map;
pub mod motion_model;
pub mod particle;
pub mod particle_filter;
pub mod range_model;
pub mod stats;

pub use error::LocalizationError;
pub use map::{Orientation, Segment, Wall, WallMap};
pub use motion_model::{Motion, MotionModel, MotionModelConfig};
pub use particle::{InitialBelief, Particle};
pub use particle_filter::{
    FilterStats, ParticleFilter, ParticleFilterConfig, PoseSpread, ResamplingStrategy,
    SensorUpdateReport,
};
pub use range_model::{RangeModel, cast_ray};
