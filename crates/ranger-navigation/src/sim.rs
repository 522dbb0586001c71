//! Simulated robot for running the control loop without hardware.
//!
//! A [`SimulatedRobot`] keeps the ground-truth pose. Its [`SimulatedDrive`]
//! turns the wheels towards the commanded targets a bounded amount per poll,
//! moving the true pose with some wheel slip; its [`SimulatedSonar`] casts a
//! ray from the true pose against the map. Both share the same state, so they
//! can live on different threads.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use ranger_hal::{DriveLimits, EmergencyStop, HalError, Mileage, MotorDrive, SonarSensor};
use ranger_kinematics::{DriveCalibration, Pose, WheelTargets};
use ranger_localization::{WallMap, cast_ray};
use tracing::{debug, trace};

use crate::error::NavigationError;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Largest wheel increment per mileage poll (drive units).
    pub units_per_poll: f64,
    /// Relative standard deviation of each wheel's actual travel.
    pub slip_sigma: f64,
    /// Standard deviation of sonar noise (cm).
    pub sonar_sigma: f64,
    /// Largest range the sonar reports (cm).
    pub sonar_max: f64,
    /// Probability that a single sonar read fails.
    pub failure_probability: f64,
    /// RNG seed; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            units_per_poll: 40.0,
            slip_sigma: 0.01,
            sonar_sigma: 1.0,
            sonar_max: 255.0,
            failure_probability: 0.05,
            seed: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    truth: Pose,
    mileage: Mileage,
    target: Mileage,
    limits: DriveLimits,
    moves: u32,
    stops: u32,
    rng: StdRng,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SimState>,
    map: WallMap,
    calibration: DriveCalibration,
    config: SimConfig,
    slip: Normal<f64>,
    echo_noise: Normal<f64>,
    estop: EmergencyStop,
}

/// Ground truth shared by the simulated drive and sonar.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    shared: Arc<Shared>,
}

impl SimulatedRobot {
    /// Creates a robot at `truth` inside `map`.
    ///
    /// # Returns
    /// * `Err(NavigationError::InvalidConfig)` for negative sigmas, a non-positive
    ///   poll increment, or a failure probability outside `[0, 1]`.
    pub fn new(
        map: WallMap,
        truth: Pose,
        calibration: DriveCalibration,
        config: SimConfig,
        estop: EmergencyStop,
    ) -> Result<Self, NavigationError> {
        if !(config.units_per_poll > 0.0) {
            return Err(NavigationError::InvalidConfig(
                "sim units_per_poll must be positive",
            ));
        }
        if !(config.sonar_max > 0.0) {
            return Err(NavigationError::InvalidConfig("sim sonar_max must be positive"));
        }
        if !(0.0..=1.0).contains(&config.failure_probability) {
            return Err(NavigationError::InvalidConfig(
                "sim failure_probability must be in [0, 1]",
            ));
        }
        let slip = Normal::new(0.0, config.slip_sigma)
            .map_err(|_| NavigationError::InvalidConfig("sim slip_sigma must be non-negative"))?;
        let echo_noise = Normal::new(0.0, config.sonar_sigma)
            .map_err(|_| NavigationError::InvalidConfig("sim sonar_sigma must be non-negative"))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        debug!(truth = %truth, "Simulated robot placed");
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SimState {
                    truth,
                    mileage: Mileage::default(),
                    target: Mileage::default(),
                    limits: DriveLimits::default(),
                    moves: 0,
                    stops: 0,
                    rng,
                }),
                map,
                calibration,
                config,
                slip,
                echo_noise,
                estop,
            }),
        })
    }

    /// A drive handle.
    pub fn drive(&self) -> SimulatedDrive {
        SimulatedDrive {
            shared: Arc::clone(&self.shared),
        }
    }

    /// A sonar handle.
    pub fn sonar(&self) -> SimulatedSonar {
        SimulatedSonar {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The ground-truth pose.
    pub fn true_pose(&self) -> Pose {
        self.shared.state.lock().truth
    }

    /// Moves commanded so far.
    pub fn moves(&self) -> u32 {
        self.shared.state.lock().moves
    }

    /// Stops commanded so far.
    pub fn stops(&self) -> u32 {
        self.shared.state.lock().stops
    }

    /// The limits last applied to the drive.
    pub fn limits(&self) -> DriveLimits {
        self.shared.state.lock().limits
    }
}

/// Simulated [`MotorDrive`].
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    shared: Arc<Shared>,
}

impl MotorDrive for SimulatedDrive {
    fn command_relative_move(&mut self, targets: WheelTargets) -> Result<(), HalError> {
        self.shared.estop.check()?;
        let mut state = self.shared.state.lock();
        state.target = state.mileage.advanced_by(targets);
        state.moves += 1;
        trace!(%targets, "Simulated move commanded");
        Ok(())
    }

    fn poll_mileage(&mut self) -> Result<Mileage, HalError> {
        self.shared.estop.check()?;
        let shared = &*self.shared;
        let mut guard = shared.state.lock();
        let state = &mut *guard;

        let remaining = state.target.since(state.mileage);
        let largest = remaining.magnitude();
        if largest > 0.0 {
            // Scale both wheels together so the chassis follows the commanded motion.
            let fraction = (shared.config.units_per_poll / largest).min(1.0);
            let commanded =
                WheelTargets::new(remaining.left * fraction, remaining.right * fraction);
            let actual = WheelTargets::new(
                commanded.left * (1.0 + shared.slip.sample(&mut state.rng)),
                commanded.right * (1.0 + shared.slip.sample(&mut state.rng)),
            );
            state.truth = state.truth.integrate(shared.calibration.odometry(actual));
            state.mileage = if fraction >= 1.0 {
                state.target
            } else {
                state.mileage.advanced_by(commanded)
            };
        }
        Ok(state.mileage)
    }

    fn stop(&mut self) -> Result<(), HalError> {
        let mut state = self.shared.state.lock();
        state.target = state.mileage;
        state.stops += 1;
        Ok(())
    }

    fn set_limits(&mut self, limits: DriveLimits) -> Result<(), HalError> {
        self.shared.state.lock().limits = limits;
        Ok(())
    }
}

/// Simulated [`SonarSensor`].
#[derive(Debug, Clone)]
pub struct SimulatedSonar {
    shared: Arc<Shared>,
}

impl SonarSensor for SimulatedSonar {
    fn read_raw(&mut self) -> Result<f64, HalError> {
        let shared = &*self.shared;
        let mut guard = shared.state.lock();
        let state = &mut *guard;
        if state.rng.random_bool(shared.config.failure_probability) {
            return Err(HalError::SensorRead("no echo".into()));
        }
        let max = shared.config.sonar_max;
        let range = match cast_ray(&shared.map, &state.truth) {
            Some(expected) => (expected + shared.echo_noise.sample(&mut state.rng)).clamp(0.0, max),
            None => max,
        };
        Ok(range)
    }
}
