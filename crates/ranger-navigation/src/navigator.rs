//! Waypoint-following control loop.
//!
//! For every waypoint the navigator runs a small state machine:
//!
//! ```text
//!   Orient ──► Approach ──► Arrived
//!     ▲           │
//!     └───────────┘  (still more than the final-leg distance away)
//! ```
//!
//! Orient turns towards the target and, after a turn, localizes against the
//! sonar. Approach drives a fixed step while far away, halves the remaining
//! distance in the approach band, and closes the final leg in one move.
//! Every move is sent to the drive first and then mirrored on the particles.

use std::f64::consts::PI;
use std::fmt;
use std::time::Duration;

use ranger_hal::{DriveLimits, Mileage, MotorDrive, SonarSensor, execute_move};
use ranger_kinematics::{DriveCalibration, Pose};
use ranger_localization::{Motion, ParticleFilter, WallMap};
use spin_sleep::SpinSleeper;
use tracing::{debug, error, info, warn};

use crate::error::NavigationError;
use crate::plan::{FailurePolicy, NavPlan, PlanReport, Waypoint};
use crate::sonar::{SonarConfig, SonarReader};
use crate::visual::{ParticleView, Visualizer};

/// Navigator phase for the current waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavState {
    /// Turn to face the target.
    Orient,
    /// Drive towards the target.
    Approach,
    /// Target reached.
    Arrived,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavState::Orient => write!(f, "orient"),
            NavState::Approach => write!(f, "approach"),
            NavState::Arrived => write!(f, "arrived"),
        }
    }
}

/// Thresholds and timing of the control loop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavigatorConfig {
    /// Turns smaller than this are skipped (rad).
    pub turn_threshold: f64,
    /// Distance at which the target counts as reached (cm).
    pub arrival_tolerance: f64,
    /// Remaining distance closed in a single move (cm).
    pub final_leg: f64,
    /// Within this distance each move covers half the remainder (cm).
    pub approach_band: f64,
    /// Step length while further than `approach_band` (cm).
    pub step_length: f64,
    /// Mileage poll interval while a move is in progress (ms).
    pub poll_interval_ms: u64,
    /// Pause between drawing the re-weighted and the resampled particles (ms).
    pub display_pause_ms: u64,
    /// Localize at the start of every orient phase, not only after turns.
    pub localize_every_cycle: bool,
    /// Wheel speed limit (drive units/s).
    pub drive_speed: f64,
    /// Wheel acceleration limit (drive units/s²).
    pub drive_acceleration: f64,
    /// Sonar acquisition.
    pub sonar: SonarConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        let limits = DriveLimits::default();
        Self {
            turn_threshold: 0.05 * PI,
            arrival_tolerance: 1.0,
            final_leg: 10.0,
            approach_band: 40.0,
            step_length: 20.0,
            poll_interval_ms: 10,
            display_pause_ms: 0,
            localize_every_cycle: false,
            drive_speed: limits.speed,
            drive_acceleration: limits.acceleration,
            sonar: SonarConfig::default(),
        }
    }
}

impl NavigatorConfig {
    fn validate(&self) -> Result<(), NavigationError> {
        let ordered = 0.0 <= self.arrival_tolerance
            && self.arrival_tolerance <= self.final_leg
            && self.final_leg <= self.approach_band;
        if !ordered {
            return Err(NavigationError::InvalidConfig(
                "expected arrival_tolerance <= final_leg <= approach_band",
            ));
        }
        if !(self.step_length > 0.0) {
            return Err(NavigationError::InvalidConfig("step_length must be positive"));
        }
        if !(self.turn_threshold >= 0.0 && self.turn_threshold < PI) {
            return Err(NavigationError::InvalidConfig(
                "turn_threshold must be in [0, π)",
            ));
        }
        Ok(())
    }
}

/// The particle belief together with the last settled encoder reading.
#[derive(Debug, Clone)]
pub struct RobotState {
    /// Pose belief.
    pub filter: ParticleFilter,
    /// Mileage at the end of the last move.
    pub mileage: Mileage,
}

/// Drives a robot through waypoints while tracking its pose with a particle filter.
pub struct Navigator<D: MotorDrive, S: SonarSensor> {
    drive: D,
    sonar: S,
    map: WallMap,
    calibration: DriveCalibration,
    config: NavigatorConfig,
    sonar_reader: SonarReader,
    state: RobotState,
    visualizer: Option<Box<dyn Visualizer + Send>>,
    sleeper: SpinSleeper,
}

impl<D: MotorDrive, S: SonarSensor> Navigator<D, S> {
    /// Creates a navigator, applies the drive limits and reads the initial mileage.
    ///
    /// # Arguments
    /// * `drive` - The motor drive moves are sent to.
    /// * `sonar` - The range sensor used for localization.
    /// * `map` - The known environment.
    /// * `filter` - The initial pose belief.
    /// * `calibration` - Conversion from cm and rad to wheel drive units.
    /// * `config` - Control loop thresholds and timing.
    pub fn new(
        mut drive: D,
        sonar: S,
        map: WallMap,
        filter: ParticleFilter,
        calibration: DriveCalibration,
        config: NavigatorConfig,
    ) -> Result<Self, NavigationError> {
        config.validate()?;
        let sonar_reader = SonarReader::new(config.sonar.clone())?;
        drive
            .set_limits(DriveLimits {
                speed: config.drive_speed,
                acceleration: config.drive_acceleration,
            })
            .map_err(NavigationError::Actuation)?;
        let mileage = drive.poll_mileage().map_err(NavigationError::Actuation)?;
        info!(
            estimate = %filter.estimate_pose(),
            particles = filter.particles().len(),
            %calibration,
            "Navigator ready"
        );
        Ok(Self {
            drive,
            sonar,
            map,
            calibration,
            config,
            sonar_reader,
            state: RobotState { filter, mileage },
            visualizer: None,
            sleeper: SpinSleeper::default(),
        })
    }

    /// Attach a visualizer and draw the map on it.
    pub fn with_visualizer(mut self, mut visualizer: Box<dyn Visualizer + Send>) -> Self {
        visualizer.draw_walls(&self.map.segments());
        self.visualizer = Some(visualizer);
        self.render();
        self
    }

    /// Current pose estimate.
    pub fn estimate(&self) -> Pose {
        self.state.filter.estimate_pose()
    }

    /// The belief and mileage.
    pub fn state(&self) -> &RobotState {
        &self.state
    }

    /// The particle filter.
    pub fn filter(&self) -> &ParticleFilter {
        &self.state.filter
    }

    /// Mutable access to the particle filter, e.g. to reset it between plans.
    pub fn filter_mut(&mut self) -> &mut ParticleFilter {
        &mut self.state.filter
    }

    /// The map.
    pub fn map(&self) -> &WallMap {
        &self.map
    }

    /// The configuration.
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// The drive.
    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// The sonar.
    pub fn sonar(&self) -> &S {
        &self.sonar
    }

    /// Perform one state transition towards `target`.
    pub fn step(&mut self, target: Waypoint, state: NavState) -> Result<NavState, NavigationError> {
        if let Some(v) = self.visualizer.as_mut() {
            v.draw_status(target.point(), state);
        }
        match state {
            NavState::Orient => self.orient(target),
            NavState::Approach => self.approach(target),
            NavState::Arrived => Ok(NavState::Arrived),
        }
    }

    fn orient(&mut self, target: Waypoint) -> Result<NavState, NavigationError> {
        if self.config.localize_every_cycle {
            self.localize()?;
        }
        let estimate = self.estimate();
        let turn = estimate.turn_towards(target.point());
        debug!(
            estimate = %estimate,
            target = %target,
            bearing = estimate.bearing_to(target.point()),
            turn,
            "Orienting"
        );
        if turn.abs() > self.config.turn_threshold {
            self.execute(Motion::Rotate(turn))?;
            self.localize()?;
        }
        Ok(NavState::Approach)
    }

    fn approach(&mut self, target: Waypoint) -> Result<NavState, NavigationError> {
        let distance = self.estimate().distance_to(target.point());
        debug!(remaining = distance, target = %target, "Approaching");
        if distance <= self.config.arrival_tolerance {
            Ok(NavState::Arrived)
        } else if distance <= self.config.final_leg {
            self.execute(Motion::Translate(distance))?;
            Ok(NavState::Arrived)
        } else if distance <= self.config.approach_band {
            self.execute(Motion::Translate(distance / 2.0))?;
            Ok(NavState::Orient)
        } else {
            self.execute(Motion::Translate(self.config.step_length))?;
            Ok(NavState::Orient)
        }
    }

    /// Send `motion` to the drive, wait for it to settle, then apply it to the particles.
    ///
    /// If the drive fails the belief is left untouched and the drive is stopped.
    pub fn execute(&mut self, motion: Motion) -> Result<Mileage, NavigationError> {
        let targets = match motion {
            Motion::Translate(distance) => self.calibration.translation(distance),
            Motion::Rotate(angle) => self.calibration.rotation(angle),
        };
        debug!(%motion, %targets, "Executing motion");
        let mileage = execute_move(
            &mut self.drive,
            targets,
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .map_err(NavigationError::Actuation)?;
        self.state.mileage = mileage;
        self.state.filter.motion_update(motion);
        self.render();
        Ok(mileage)
    }

    /// Read the sonar, re-weight and resample the particles.
    pub fn localize(&mut self) -> Result<Pose, NavigationError> {
        let observed = self.sonar_reader.read_median(&mut self.sonar)?;
        let report = self.state.filter.sensor_update(&self.map, observed)?;
        self.render();
        if self.config.display_pause_ms > 0 && self.visualizer.is_some() {
            self.sleeper.sleep(Duration::from_millis(self.config.display_pause_ms));
        }
        self.state.filter.resample();
        self.render();
        let estimate = self.estimate();
        debug!(
            observed,
            survivors = report.survivors,
            ess = report.effective_sample_size,
            estimate = %estimate,
            "Localized"
        );
        Ok(estimate)
    }

    /// Run the state machine until `target` is reached.
    ///
    /// On failure the drive is stopped before the error is returned.
    pub fn go_to(&mut self, target: Waypoint) -> Result<Pose, NavigationError> {
        let mut state = NavState::Orient;
        while state != NavState::Arrived {
            state = match self.step(target, state) {
                Ok(next) => next,
                Err(e) => {
                    self.halt();
                    return Err(e);
                }
            };
        }
        if let Some(v) = self.visualizer.as_mut() {
            v.draw_status(target.point(), NavState::Arrived);
        }
        let estimate = self.estimate();
        info!(expected = %target, estimate = %estimate, "Waypoint reached");
        Ok(estimate)
    }

    /// Visit every waypoint of `plan` in order.
    ///
    /// With [`FailurePolicy::Abort`] the first failure ends the plan. With
    /// [`FailurePolicy::SkipWaypoint`] the failed waypoint is recorded as skipped,
    /// unless the failure is fatal (emergency stop).
    pub fn run_plan(
        &mut self,
        plan: &mut NavPlan,
        policy: FailurePolicy,
    ) -> Result<PlanReport, NavigationError> {
        let mut report = PlanReport::default();
        while let Some(waypoint) = plan.next_waypoint() {
            match self.go_to(waypoint) {
                Ok(_) => report.reached.push(waypoint),
                Err(e) => {
                    error!(waypoint = %waypoint, error = %e, "Waypoint failed");
                    if policy == FailurePolicy::Abort || e.is_fatal() {
                        return Err(e);
                    }
                    warn!(waypoint = %waypoint, "Skipping waypoint");
                    report.skipped.push(waypoint);
                }
            }
        }
        report.final_estimate = self.estimate();
        info!(
            reached = report.reached.len(),
            skipped = report.skipped.len(),
            estimate = %report.final_estimate,
            "Plan finished"
        );
        Ok(report)
    }

    /// Stop the drive, logging any failure.
    pub fn halt(&mut self) {
        match self.drive.stop() {
            Ok(()) => info!("Drive halted"),
            Err(e) => error!(error = %e, "Failed to halt drive"),
        }
    }

    fn render(&mut self) {
        if let Some(v) = self.visualizer.as_mut() {
            let views: Vec<ParticleView> = self
                .state
                .filter
                .particles()
                .iter()
                .map(ParticleView::from)
                .collect();
            v.draw_particles(&views);
            v.draw_estimate(&self.state.filter.estimate_pose());
        }
    }
}
