//! Small statistics helpers over particle sets and sample buffers.

use std::f64::consts::TAU;

use ranger_kinematics::normalize_angle;

use crate::particle::Particle;

/// Middle element of `values` after sorting, or `None` if empty.
///
/// For an even count the upper of the two middle elements is returned.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(values[values.len() / 2])
}

/// Sum of all particle weights.
pub fn total_weight(particles: &[Particle]) -> f64 {
    particles.iter().map(|p| p.weight).sum()
}

/// Scale weights so they sum to 1. Returns the total before scaling.
///
/// Leaves the weights untouched if the total is not positive.
pub fn normalize_weights(particles: &mut [Particle]) -> f64 {
    let total = total_weight(particles);
    if total > 0.0 {
        for p in particles.iter_mut() {
            p.weight /= total;
        }
    }
    total
}

/// Effective sample size `1 / Σw²` of normalized weights.
pub fn effective_sample_size(particles: &[Particle]) -> f64 {
    let sum_sq: f64 = particles.iter().map(|p| p.weight * p.weight).sum();
    if sum_sq > 0.0 { 1.0 / sum_sq } else { 0.0 }
}

/// Running sums of the weights.
pub fn cumulative_weights(particles: &[Particle]) -> Vec<f64> {
    particles
        .iter()
        .scan(0.0, |acc, p| {
            *acc += p.weight;
            Some(*acc)
        })
        .collect()
}

/// Weighted circular mean of `(angle, weight)` pairs, in `[0, 2π)`.
pub fn circular_mean<I>(samples: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sin_sum, cos_sum) = samples
        .into_iter()
        .fold((0.0, 0.0), |(s, c), (angle, w)| {
            (s + w * angle.sin(), c + w * angle.cos())
        });
    normalize_angle(sin_sum.atan2(cos_sum))
}

/// Circular standard deviation `sqrt(-2 ln R)` of weighted angles, with `R` the
/// mean resultant length. Zero for identical angles, growing without bound as
/// the angles spread around the circle.
pub fn circular_std<I>(samples: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sin_sum, cos_sum, w_sum) =
        samples
            .into_iter()
            .fold((0.0, 0.0, 0.0), |(s, c, t), (angle, w)| {
                (s + w * angle.sin(), c + w * angle.cos(), t + w)
            });
    if w_sum <= 0.0 {
        return 0.0;
    }
    let r = ((sin_sum / w_sum).powi(2) + (cos_sum / w_sum).powi(2)).sqrt();
    if r >= 1.0 {
        0.0
    } else if r <= 0.0 {
        TAU
    } else {
        (-2.0 * r.ln()).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranger_kinematics::Pose;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn particles(weights: &[f64]) -> Vec<Particle> {
        weights
            .iter()
            .map(|&w| Particle::new(Pose::default(), w))
            .collect()
    }

    #[test]
    fn test_median_ignores_outliers() {
        let mut reads = [40.0, 41.0, 255.0, 40.5, 3.0, 40.2, 39.8, 40.1, 40.0, 41.2, 0.0];
        assert_eq!(median(&mut reads), Some(40.1));
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [2.0, 1.0]), Some(2.0));
    }

    #[test]
    fn test_normalize_weights() {
        let mut set = particles(&[1.0, 3.0]);
        let total = normalize_weights(&mut set);
        assert!((total - 4.0).abs() < EPSILON);
        assert!((set[0].weight - 0.25).abs() < EPSILON);
        assert!((set[1].weight - 0.75).abs() < EPSILON);

        let mut zeros = particles(&[0.0, 0.0]);
        assert_eq!(normalize_weights(&mut zeros), 0.0);
        assert_eq!(zeros[0].weight, 0.0);
    }

    #[test]
    fn test_effective_sample_size() {
        let uniform = particles(&[0.25; 4]);
        assert!((effective_sample_size(&uniform) - 4.0).abs() < EPSILON);
        let collapsed = particles(&[1.0, 0.0, 0.0]);
        assert!((effective_sample_size(&collapsed) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_cumulative_weights() {
        let c = cumulative_weights(&particles(&[0.1, 0.2, 0.7]));
        assert!((c[0] - 0.1).abs() < EPSILON);
        assert!((c[1] - 0.3).abs() < EPSILON);
        assert!((c[2] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_circular_mean_wraps() {
        // Headings either side of zero average to zero, not π.
        let mean = circular_mean([(0.1, 0.5), (2.0 * PI - 0.1, 0.5)]);
        assert!(mean < EPSILON || (2.0 * PI - mean) < EPSILON);
        let mean = circular_mean([(PI / 2.0, 1.0), (PI, 1.0)]);
        assert!((mean - 0.75 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_circular_std() {
        assert!(circular_std([(1.0, 0.5), (1.0, 0.5)]).abs() < 1e-6);
        assert!(circular_std([(0.9, 0.5), (1.1, 0.5)]) > 0.05);
        assert_eq!(circular_std(std::iter::empty()), 0.0);
    }
}
