use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use ranger_kinematics::{DriveCalibration, Pose};
use ranger_localization::{
    InitialBelief, MotionModelConfig, ParticleFilterConfig, RangeModel, Segment, WallMap,
};
use ranger_navigation::{FailurePolicy, NavPlan, NavigatorConfig, SimConfig, Waypoint};
use serde::Deserialize;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Overrides the config file location.
const CONFIG_PATH_VAR: &str = "RANGER_CONFIG";

/// Everything the supervisor needs to build and run the robot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub robot: RobotSettings,
    pub filter: ParticleFilterConfig,
    pub motion: MotionModelConfig,
    pub sonar: SonarModelSettings,
    pub drive: DriveSettings,
    pub navigator: NavigatorConfig,
    pub map: MapSettings,
    pub plan: PlanSettings,
    pub sim: SimConfig,
    pub watchdog: WatchdogSettings,
    pub render: RenderSettings,
}

/// Start pose and how sure we are about it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotSettings {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    /// Zero together with `sigma_theta` means the start pose is known exactly.
    pub sigma_xy: f64,
    pub sigma_theta: f64,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            x: 84.0,
            y: 30.0,
            theta: 0.0,
            sigma_xy: 0.0,
            sigma_theta: 0.0,
        }
    }
}

impl RobotSettings {
    pub fn start(&self) -> Pose {
        Pose::new(self.x, self.y, self.theta)
    }

    pub fn belief(&self) -> InitialBelief {
        if self.sigma_xy == 0.0 && self.sigma_theta == 0.0 {
            InitialBelief::Known(self.start())
        } else {
            InitialBelief::Gaussian {
                mean: self.start(),
                sigma_xy: self.sigma_xy,
                sigma_theta: self.sigma_theta,
            }
        }
    }
}

/// Range likelihood parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SonarModelSettings {
    pub sigma: f64,
    pub floor: f64,
}

impl Default for SonarModelSettings {
    fn default() -> Self {
        Self {
            sigma: RangeModel::DEFAULT_SIGMA,
            floor: RangeModel::DEFAULT_FLOOR,
        }
    }
}

impl SonarModelSettings {
    pub fn model(&self) -> anyhow::Result<RangeModel> {
        RangeModel::new(self.sigma, self.floor).context("invalid [sonar] settings")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    pub units_per_cm: f64,
    pub units_per_radian: f64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        let calibration = DriveCalibration::default();
        Self {
            units_per_cm: calibration.units_per_cm(),
            units_per_radian: calibration.units_per_radian(),
        }
    }
}

impl DriveSettings {
    pub fn calibration(&self) -> anyhow::Result<DriveCalibration> {
        DriveCalibration::new(self.units_per_cm, self.units_per_radian)
            .map_err(|e| anyhow::anyhow!("invalid [drive] settings: {}", e))
    }
}

/// Walls as segment endpoints; empty selects the reference arena.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub walls: Vec<Segment>,
}

impl MapSettings {
    pub fn build(&self) -> anyhow::Result<WallMap> {
        if self.walls.is_empty() {
            return Ok(WallMap::arena());
        }
        WallMap::from_segments(self.walls.iter().copied()).context("invalid [map] walls")
    }
}

/// Waypoints to visit; empty selects the arena tour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    pub waypoints: Vec<Waypoint>,
    pub failure_policy: FailurePolicy,
}

impl PlanSettings {
    pub fn build(&self) -> NavPlan {
        if self.waypoints.is_empty() {
            NavPlan::arena_tour()
        } else {
            self.waypoints.iter().copied().collect()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    /// Longest tolerated gap between two progress reports of the control loop.
    pub timeout_ms: u64,
    pub period_ms: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            period_ms: 250,
        }
    }
}

impl WatchdogSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Open a window showing the filter.
    pub enabled: bool,
    /// Write `drawLine:`/`drawParticles:` lines to stdout.
    pub canvas_log: bool,
    pub window_size: i32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            canvas_log: false,
            window_size: 768,
        }
    }
}

/// Reads `config/default.toml` (or `$RANGER_CONFIG`) and applies
/// `RANGER__SECTION__KEY` environment overrides.
pub fn load_settings() -> anyhow::Result<Settings> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!(path = %path, "Loading configuration");

    let config = Config::builder()
        .add_source(File::new(&path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("RANGER")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read configuration from {}", path))?;
    let settings = parse(config)?;
    debug!(?settings, "Configuration loaded");
    Ok(settings)
}

fn parse(config: Config) -> anyhow::Result<Settings> {
    config
        .try_deserialize::<Settings>()
        .context("configuration does not match the expected layout")
}
