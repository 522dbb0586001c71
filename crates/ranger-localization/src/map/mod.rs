//! Known static environment, described as a set of axis-aligned walls.
//!
//! The map is built once and never changes; the range model casts rays
//! against it to predict what the sonar should read from a given pose.

pub mod wall;

pub use wall::{Orientation, Segment, Wall};

use ranger_kinematics::Point;

use crate::error::LocalizationError;

/// An immutable collection of walls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WallMap {
    walls: Vec<Wall>,
}

impl WallMap {
    /// Creates a map from a list of walls.
    ///
    /// # Returns
    /// * `Err(LocalizationError::EmptyMap)` if `walls` is empty.
    pub fn new(walls: Vec<Wall>) -> Result<Self, LocalizationError> {
        if walls.is_empty() {
            return Err(LocalizationError::EmptyMap);
        }
        Ok(WallMap { walls })
    }

    /// Creates a map from segment endpoints, each of which must be axis-aligned.
    pub fn from_segments<I>(segments: I) -> Result<Self, LocalizationError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let walls = segments
            .into_iter()
            .map(|s| Wall::from_segment(s.x1, s.y1, s.x2, s.y2))
            .collect::<Result<Vec<_>, _>>()?;
        WallMap::new(walls)
    }

    /// The reference course: a 210 cm square with its top-left and right-middle
    /// corners cut away.
    pub fn arena() -> Self {
        WallMap {
            walls: vec![
                Wall::vertical(0.0, 0.0, 168.0),
                Wall::horizontal(168.0, 0.0, 84.0),
                Wall::vertical(84.0, 126.0, 210.0),
                Wall::horizontal(210.0, 84.0, 168.0),
                Wall::vertical(168.0, 84.0, 210.0),
                Wall::horizontal(84.0, 168.0, 210.0),
                Wall::vertical(210.0, 0.0, 84.0),
                Wall::horizontal(0.0, 0.0, 210.0),
            ],
        }
    }

    /// The walls of the map.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// The walls as drawable segments.
    pub fn segments(&self) -> Vec<Segment> {
        self.walls.iter().map(Wall::segment).collect()
    }

    /// Axis-aligned bounding box `(min, max)` of all walls.
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for s in self.segments() {
            min.x = min.x.min(s.x1).min(s.x2);
            min.y = min.y.min(s.y1).min(s.y2);
            max.x = max.x.max(s.x1).max(s.x2);
            max.y = max.y.max(s.y1).max(s.y2);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map_rejected() {
        assert_eq!(WallMap::new(Vec::new()), Err(LocalizationError::EmptyMap));
    }

    #[test]
    fn test_arena_layout() {
        let map = WallMap::arena();
        assert_eq!(map.walls().len(), 8);
        let (min, max) = map.bounds();
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(210.0, 210.0));
    }

    #[test]
    fn test_from_segments_round_trip() {
        let arena = WallMap::arena();
        let rebuilt = WallMap::from_segments(arena.segments()).unwrap();
        assert_eq!(rebuilt, arena);
    }

    #[test]
    fn test_from_segments_propagates_diagonal() {
        let segments = [Segment {
            x1: 0.0,
            y1: 0.0,
            x2: 3.0,
            y2: 4.0,
        }];
        assert!(matches!(
            WallMap::from_segments(segments),
            Err(LocalizationError::NonAxisAlignedWall { .. })
        ));
    }
}
