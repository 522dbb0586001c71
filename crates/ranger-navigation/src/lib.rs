//! Waypoint navigation for a differential-drive robot localized by sonar.
//!
//! The [`Navigator`] owns the drive, the sonar and a particle filter. For each
//! waypoint of a [`NavPlan`] it alternates turning, localizing and driving
//! until the pose estimate is at the target.

pub mod error;
pub mod navigator;
pub mod plan;
pub mod sim;
pub mod sonar;
pub mod visual;

pub use error::NavigationError;
pub use navigator::{NavState, Navigator, NavigatorConfig, RobotState};
pub use plan::{FailurePolicy, NavPlan, PlanReport, Waypoint};
pub use sim::{SimConfig, SimulatedDrive, SimulatedRobot, SimulatedSonar};
pub use sonar::{SonarConfig, SonarReader};
pub use visual::{Canvas, CanvasLog, Fanout, ParticleView, Visualizer};
