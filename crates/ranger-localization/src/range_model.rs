//! Expected-range ray casting and the sonar measurement likelihood.

use ranger_kinematics::Pose;

use crate::error::LocalizationError;
use crate::map::WallMap;

/// Distance from `pose` to the nearest wall straight ahead.
///
/// Returns `None` when no wall lies ahead, i.e. the pose faces out of the mapped region.
pub fn cast_ray(map: &WallMap, pose: &Pose) -> Option<f64> {
    map.walls()
        .iter()
        .filter_map(|wall| wall.intersect(pose))
        .min_by(f64::total_cmp)
}

/// Gaussian range likelihood with a constant floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeModel {
    sigma: f64,
    floor: f64,
}

impl RangeModel {
    /// Default sensor noise standard deviation (cm).
    pub const DEFAULT_SIGMA: f64 = 2.0;
    /// Default likelihood floor.
    pub const DEFAULT_FLOOR: f64 = 0.05;

    /// Creates a range model.
    ///
    /// # Arguments
    /// * `sigma` - Sensor noise standard deviation in centimeters, must be positive.
    /// * `floor` - Constant added to every likelihood, must be positive.
    pub fn new(sigma: f64, floor: f64) -> Result<Self, LocalizationError> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(LocalizationError::invalid(
                "sigma",
                "must be positive and finite",
            ));
        }
        if !(floor.is_finite() && floor > 0.0) {
            return Err(LocalizationError::invalid(
                "floor",
                "must be positive and finite",
            ));
        }
        Ok(RangeModel { sigma, floor })
    }

    /// Sensor noise standard deviation (cm).
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Likelihood floor.
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Likelihood of reading `observed` when the geometry predicts `expected`.
    ///
    /// Always at least `floor`, peaking at `1 + floor` for an exact match.
    pub fn likelihood(&self, expected: f64, observed: f64) -> f64 {
        let z = (expected - observed) / self.sigma;
        (-0.5 * z * z).exp() + self.floor
    }

    /// Likelihood of `observed` from `pose`, or `None` when the pose has no ray solution.
    pub fn score(&self, map: &WallMap, pose: &Pose, observed: f64) -> Option<f64> {
        cast_ray(map, pose).map(|expected| self.likelihood(expected, observed))
    }
}

impl Default for RangeModel {
    fn default() -> Self {
        RangeModel {
            sigma: Self::DEFAULT_SIGMA,
            floor: Self::DEFAULT_FLOOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Wall;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_cast_ray_east_from_start() {
        let map = WallMap::arena();
        let range = cast_ray(&map, &Pose::new(84.0, 30.0, 0.0)).unwrap();
        assert!((range - 126.0).abs() < EPSILON);
    }

    #[test]
    fn test_cast_ray_takes_nearest_wall() {
        let map = WallMap::arena();
        // Facing north from (100, 30): the top wall d at y=210.
        let range = cast_ray(&map, &Pose::new(100.0, 30.0, PI / 2.0)).unwrap();
        assert!((range - 180.0).abs() < 1e-6);
        // From (40, 30) the cut-away corner wall b at y=168 comes first.
        let range = cast_ray(&map, &Pose::new(40.0, 30.0, PI / 2.0)).unwrap();
        assert!((range - 138.0).abs() < 1e-6);
        // Facing south: the floor wall at y=0.
        let range = cast_ray(&map, &Pose::new(84.0, 30.0, 1.5 * PI)).unwrap();
        assert!((range - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_cast_ray_no_solution_outside() {
        let map = WallMap::new(vec![Wall::vertical(10.0, 0.0, 10.0)]).unwrap();
        assert_eq!(cast_ray(&map, &Pose::new(0.0, 5.0, PI)), None);
        assert!(cast_ray(&map, &Pose::new(0.0, 5.0, 0.0)).is_some());
    }

    #[test]
    fn test_likelihood_shape() {
        let model = RangeModel::default();
        assert!((model.likelihood(50.0, 50.0) - 1.05).abs() < EPSILON);
        // One sigma away: exp(-0.5) + floor
        let one_sigma = model.likelihood(50.0, 52.0);
        assert!((one_sigma - ((-0.5f64).exp() + 0.05)).abs() < EPSILON);
        // Far away the floor dominates but never reaches zero.
        let far = model.likelihood(50.0, 250.0);
        assert!(far >= 0.05 && far < 0.05 + 1e-12);
    }

    #[test]
    fn test_score_none_without_solution() {
        let map = WallMap::new(vec![Wall::vertical(10.0, 0.0, 10.0)]).unwrap();
        let model = RangeModel::default();
        assert_eq!(model.score(&map, &Pose::new(0.0, 5.0, PI), 10.0), None);
        let hit = model.score(&map, &Pose::new(0.0, 5.0, 0.0), 10.0).unwrap();
        assert!((hit - 1.05).abs() < EPSILON);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(RangeModel::new(0.0, 0.05).is_err());
        assert!(RangeModel::new(2.0, 0.0).is_err());
        assert!(RangeModel::new(f64::NAN, 0.05).is_err());
        assert!(RangeModel::new(2.0, 0.05).is_ok());
    }
}
