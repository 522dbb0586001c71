use std::collections::VecDeque;
use std::fmt;

use ranger_kinematics::{Point, Pose};
use tracing::info;

/// A target position in the map frame (cm).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Target x (cm).
    pub x: f64,
    /// Target y (cm).
    pub y: f64,
}

impl Waypoint {
    /// Creates a waypoint.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The waypoint as a point.
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((x, y): (f64, f64)) -> Self {
        Waypoint::new(x, y)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// What to do when a waypoint cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailurePolicy {
    /// Stop the plan at the first failed waypoint.
    #[default]
    Abort,
    /// Give up on the failed waypoint and continue with the next one.
    SkipWaypoint,
}

/// Outcome of running a plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanReport {
    /// Waypoints reached, in order.
    pub reached: Vec<Waypoint>,
    /// Waypoints given up on.
    pub skipped: Vec<Waypoint>,
    /// Pose estimate when the plan ended.
    pub final_estimate: Pose,
}

/// An ordered queue of waypoints, consumed front to back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavPlan {
    queue: VecDeque<Waypoint>,
}

impl NavPlan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference tour of the arena, starting and ending near (84, 30).
    pub fn arena_tour() -> Self {
        [
            (180.0, 30.0),
            (180.0, 54.0),
            (138.0, 54.0),
            (138.0, 168.0),
            (114.0, 168.0),
            (114.0, 84.0),
            (84.0, 84.0),
            (84.0, 30.0),
        ]
        .into_iter()
        .map(Waypoint::from)
        .collect()
    }

    /// Adds a waypoint to the back of the plan.
    pub fn push(&mut self, waypoint: Waypoint) {
        self.queue.push_back(waypoint);
    }

    /// Removes and returns the next waypoint.
    pub fn next_waypoint(&mut self) -> Option<Waypoint> {
        let next = self.queue.pop_front();
        match next {
            Some(wp) => info!(
                waypoint = %wp,
                remaining = self.queue.len(),
                "Waypoint taken from plan"
            ),
            None => info!("Plan exhausted"),
        }
        next
    }

    /// The next waypoint without removing it.
    pub fn peek(&self) -> Option<&Waypoint> {
        self.queue.front()
    }

    /// Waypoints left.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the plan is exhausted.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterate the remaining waypoints.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.queue.iter()
    }

    /// Drops all remaining waypoints.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl FromIterator<Waypoint> for NavPlan {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}
