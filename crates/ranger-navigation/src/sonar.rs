//! Outlier-robust sonar acquisition.
//!
//! A single ultrasonic echo is easily corrupted by cross-talk or a missed
//! return, so every localization step waits for the robot to settle, takes a
//! fixed number of readings and uses their median.

use std::time::Duration;

use ranger_hal::{HalError, SonarSensor};
use ranger_localization::stats;
use spin_sleep::SpinSleeper;
use tracing::{debug, warn};

use crate::error::NavigationError;

/// Sonar acquisition parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SonarConfig {
    /// Successful readings per median.
    pub samples: usize,
    /// Delay before the first reading, letting the chassis stop swaying (ms).
    pub settle_ms: u64,
    /// Delay between readings (ms).
    pub interval_ms: u64,
    /// Maximum read attempts per median; `None` allows three attempts per sample.
    pub max_attempts: Option<usize>,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            samples: 11,
            settle_ms: 1500,
            interval_ms: 100,
            max_attempts: None,
        }
    }
}

impl SonarConfig {
    /// Total read attempts allowed for one median.
    pub fn attempt_budget(&self) -> usize {
        self.max_attempts.unwrap_or(self.samples * 3)
    }
}

/// Takes median range readings from a [`SonarSensor`].
#[derive(Debug, Clone)]
pub struct SonarReader {
    config: SonarConfig,
    sleeper: SpinSleeper,
}

impl SonarReader {
    /// Creates a reader.
    ///
    /// # Returns
    /// * `Err(NavigationError::InvalidConfig)` if `samples` is zero or the budget is smaller than `samples`.
    pub fn new(config: SonarConfig) -> Result<Self, NavigationError> {
        if config.samples == 0 {
            return Err(NavigationError::InvalidConfig(
                "sonar samples must be at least 1",
            ));
        }
        if config.attempt_budget() < config.samples {
            return Err(NavigationError::InvalidConfig(
                "sonar attempt budget is smaller than the sample count",
            ));
        }
        Ok(Self {
            config,
            sleeper: SpinSleeper::default(),
        })
    }

    /// The acquisition parameters.
    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Settle, collect `samples` good readings and return their median.
    ///
    /// Failed or non-finite reads are retried until the attempt budget runs out,
    /// which yields `NavigationError::SensorTransient`. Errors other than a
    /// failed read are returned immediately.
    pub fn read_median<S: SonarSensor + ?Sized>(
        &self,
        sensor: &mut S,
    ) -> Result<f64, NavigationError> {
        self.sleeper.sleep(Duration::from_millis(self.config.settle_ms));

        let budget = self.config.attempt_budget();
        let interval = Duration::from_millis(self.config.interval_ms);
        let mut readings = Vec::with_capacity(self.config.samples);
        let mut attempts = 0;

        while readings.len() < self.config.samples {
            if attempts >= budget {
                warn!(
                    attempts,
                    successes = readings.len(),
                    "Sonar attempt budget exhausted"
                );
                return Err(NavigationError::SensorTransient {
                    attempts,
                    successes: readings.len(),
                });
            }
            attempts += 1;
            match sensor.read_raw() {
                Ok(range) if range.is_finite() => readings.push(range),
                Ok(range) => {
                    warn!(attempt = attempts, range, "Discarding non-finite sonar reading")
                }
                Err(HalError::SensorRead(reason)) => {
                    warn!(attempt = attempts, %reason, "Sonar read failed, retrying")
                }
                Err(other) => return Err(NavigationError::Actuation(other)),
            }
            if readings.len() < self.config.samples {
                self.sleeper.sleep(interval);
            }
        }

        let median = stats::median(&mut readings).ok_or(NavigationError::SensorTransient {
            attempts,
            successes: 0,
        })?;
        debug!(median, attempts, "Sonar median acquired");
        Ok(median)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedSonar {
        script: VecDeque<Result<f64, HalError>>,
        reads: usize,
    }

    impl ScriptedSonar {
        fn new(script: Vec<Result<f64, HalError>>) -> Self {
            Self {
                script: script.into(),
                reads: 0,
            }
        }
    }

    impl SonarSensor for ScriptedSonar {
        fn read_raw(&mut self) -> Result<f64, HalError> {
            self.reads += 1;
            self.script
                .pop_front()
                .unwrap_or(Err(HalError::SensorRead("script exhausted".into())))
        }
    }

    fn fast(samples: usize, max_attempts: Option<usize>) -> SonarReader {
        SonarReader::new(SonarConfig {
            samples,
            settle_ms: 0,
            interval_ms: 0,
            max_attempts,
        })
        .unwrap()
    }

    fn failed() -> Result<f64, HalError> {
        Err(HalError::SensorRead("no echo".into()))
    }

    #[test]
    fn test_median_rejects_outliers() {
        let mut sonar = ScriptedSonar::new(vec![
            Ok(126.0),
            Ok(255.0),
            Ok(125.5),
            Ok(3.0),
            Ok(126.2),
        ]);
        let median = fast(5, None).read_median(&mut sonar).unwrap();
        assert_eq!(median, 126.0);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let mut sonar = ScriptedSonar::new(vec![
            Ok(40.0),
            failed(),
            Ok(41.0),
            Ok(f64::NAN),
            Ok(39.0),
        ]);
        let median = fast(3, None).read_median(&mut sonar).unwrap();
        assert_eq!(median, 40.0);
        assert_eq!(sonar.reads, 5);
    }

    #[test]
    fn test_budget_exhaustion_surfaces() {
        let mut sonar = ScriptedSonar::new(vec![Ok(40.0), failed(), failed(), failed()]);
        let err = fast(3, Some(4)).read_median(&mut sonar).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::SensorTransient {
                attempts: 4,
                successes: 1
            }
        ));
    }

    #[test]
    fn test_non_read_errors_propagate() {
        let mut sonar = ScriptedSonar::new(vec![Err(HalError::EmergencyStop)]);
        let err = fast(3, None).read_median(&mut sonar).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::Actuation(HalError::EmergencyStop)
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(SonarReader::new(SonarConfig {
            samples: 0,
            ..SonarConfig::default()
        })
        .is_err());
        assert!(SonarReader::new(SonarConfig {
            samples: 11,
            max_attempts: Some(5),
            ..SonarConfig::default()
        })
        .is_err());
        assert_eq!(SonarConfig::default().attempt_budget(), 33);
    }
}
