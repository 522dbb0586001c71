//! Axis-aligned wall segments and ray intersection.

use ranger_kinematics::Pose;

use crate::error::LocalizationError;

/// Which axis a wall runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// The wall lies on a line `y = anchor`.
    Horizontal,
    /// The wall lies on a line `x = anchor`.
    Vertical,
}

/// A drawable line segment between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// First endpoint x.
    pub x1: f64,
    /// First endpoint y.
    pub y1: f64,
    /// Second endpoint x.
    pub x2: f64,
    /// Second endpoint y.
    pub y2: f64,
}

/// An oriented axis-aligned wall.
///
/// The wall lies on the line fixed by `anchor` and spans the closed interval
/// `[lower, upper]` along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wall {
    orientation: Orientation,
    anchor: f64,
    lower: f64,
    upper: f64,
}

impl Wall {
    /// A horizontal wall on `y = y` spanning `x` between `x_from` and `x_to`.
    pub fn horizontal(y: f64, x_from: f64, x_to: f64) -> Self {
        Wall {
            orientation: Orientation::Horizontal,
            anchor: y,
            lower: x_from.min(x_to),
            upper: x_from.max(x_to),
        }
    }

    /// A vertical wall on `x = x` spanning `y` between `y_from` and `y_to`.
    pub fn vertical(x: f64, y_from: f64, y_to: f64) -> Self {
        Wall {
            orientation: Orientation::Vertical,
            anchor: x,
            lower: y_from.min(y_to),
            upper: y_from.max(y_to),
        }
    }

    /// Build a wall from segment endpoints.
    ///
    /// # Errors
    /// Returns `LocalizationError::NonAxisAlignedWall` when the endpoints differ in both coordinates.
    pub fn from_segment(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, LocalizationError> {
        if x1 == x2 {
            Ok(Wall::vertical(x1, y1, y2))
        } else if y1 == y2 {
            Ok(Wall::horizontal(y1, x1, x2))
        } else {
            Err(LocalizationError::NonAxisAlignedWall { x1, y1, x2, y2 })
        }
    }

    /// Orientation of the wall.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The fixed coordinate of the wall's line.
    pub fn anchor(&self) -> f64 {
        self.anchor
    }

    /// The closed interval `(lower, upper)` the wall covers along its free axis.
    pub fn interval(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Forward distance along the heading of `pose` to this wall, if the ray hits it.
    ///
    /// A ray exactly parallel to the wall never hits it. Hits at zero or negative
    /// distance are ignored; interval endpoints count as hits.
    pub fn intersect(&self, pose: &Pose) -> Option<f64> {
        let (sin, cos) = pose.theta.sin_cos();
        let (t, free) = match self.orientation {
            Orientation::Horizontal => {
                if sin == 0.0 {
                    return None;
                }
                let t = (self.anchor - pose.y) / sin;
                (t, pose.x + t * cos)
            }
            Orientation::Vertical => {
                if cos == 0.0 {
                    return None;
                }
                let t = (self.anchor - pose.x) / cos;
                (t, pose.y + t * sin)
            }
        };
        (t > 0.0 && free >= self.lower && free <= self.upper).then_some(t)
    }

    /// The wall as a drawable segment.
    pub fn segment(&self) -> Segment {
        match self.orientation {
            Orientation::Horizontal => Segment {
                x1: self.lower,
                y1: self.anchor,
                x2: self.upper,
                y2: self.anchor,
            },
            Orientation::Vertical => Segment {
                x1: self.anchor,
                y1: self.lower,
                x2: self.anchor,
                y2: self.upper,
            },
        }
    }
}
