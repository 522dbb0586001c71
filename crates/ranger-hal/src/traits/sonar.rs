use crate::error::HalError;

/// A single forward-facing range sensor.
pub trait SonarSensor {
    /// Take one raw range reading in centimeters.
    ///
    /// Transient failures are reported as [`HalError::SensorRead`] and may be retried.
    fn read_raw(&mut self) -> Result<f64, HalError>;
}

impl<T: SonarSensor + ?Sized> SonarSensor for Box<T> {
    fn read_raw(&mut self) -> Result<f64, HalError> {
        (**self).read_raw()
    }
}
