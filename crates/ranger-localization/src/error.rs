//! This module defines the error types used by the `ranger-localization` crate.

#![warn(missing_docs)]

use thiserror::Error;

/// Error type for localization operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocalizationError {
    /// No particle survived a sensor update.
    ///
    /// Every particle was facing out of the mapped region, so none of them could
    /// explain the observation. The particle set is left as it was before the update.
    #[error("filter degeneracy: none of {particles} particles can explain a {observed:.1} cm range")]
    FilterDegeneracy {
        /// Number of particles in the set when the update was attempted.
        particles: usize,
        /// The observed range (cm).
        observed: f64,
    },
    /// A model or filter parameter is out of its valid domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// What the parameter must satisfy.
        reason: &'static str,
    },
    /// A wall map was built without walls.
    #[error("wall map must contain at least one wall")]
    EmptyMap,
    /// A wall segment is neither horizontal nor vertical.
    #[error("wall ({x1}, {y1}) -> ({x2}, {y2}) is not axis-aligned")]
    NonAxisAlignedWall {
        /// First endpoint x.
        x1: f64,
        /// First endpoint y.
        y1: f64,
        /// Second endpoint x.
        x2: f64,
        /// Second endpoint y.
        y2: f64,
    },
}

impl LocalizationError {
    pub(crate) fn invalid(name: &'static str, reason: &'static str) -> Self {
        LocalizationError::InvalidParameter { name, reason }
    }
}
