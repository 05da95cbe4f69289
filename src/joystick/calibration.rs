//! # Calibration Module
//!
//! Maps raw analog readings onto the symmetric output range of a stick axis.
//!
//! ## Clamping
//!
//! Each axis is calibrated with the raw interval `[low, high]` its
//! potentiometer actually produces. Readings outside that interval are
//! clamped to the nearest endpoint before scaling, so a worn or noisy stick
//! never produces values beyond the output range.
//!
//! ## Scaling
//!
//! The clamped value is scaled linearly:
//!
//! `output = out_min + (clamped - low) / (high - low) * (out_max - out_min)`
//!
//! ## Usage
//!
//! ```
//! use omnimote::joystick::calibration::{normalize, AxisCalibration};
//!
//! let cal = AxisCalibration::new(-4.0, 7.0)?;
//!
//! assert_eq!(normalize(-4.0, &cal, -100.0, 100.0), -100.0);
//! assert_eq!(normalize(7.0, &cal, -100.0, 100.0), 100.0);
//! // Out of range readings are clamped
//! assert_eq!(normalize(10.0, &cal, -100.0, 100.0), 100.0);
//! # Ok::<(), omnimote::error::RemoteError>(())
//! ```

use crate::error::{RemoteError, Result};

/// Raw input interval of a single stick axis.
///
/// Validated once at construction; `low < high` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    low: f64,
    high: f64,
}

impl AxisCalibration {
    /// Creates a calibration for the raw interval `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidCalibration`] if `low >= high` or either
    /// bound is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use omnimote::joystick::calibration::AxisCalibration;
    ///
    /// assert!(AxisCalibration::new(0.0, 3.0).is_ok());
    /// assert!(AxisCalibration::new(5.0, 5.0).is_err());
    /// ```
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(RemoteError::InvalidCalibration { low, high });
        }
        Ok(Self { low, high })
    }

    /// Returns the lower raw bound.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the upper raw bound.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }
}

/// Clamps `raw` into the calibrated interval and scales it to `[out_min, out_max]`.
///
/// # Arguments
///
/// * `raw` - Raw reading from the analog source
/// * `cal` - Calibrated raw interval of the axis
/// * `out_min` - Output value at `cal.low()`
/// * `out_max` - Output value at `cal.high()`
#[must_use]
pub fn normalize(raw: f64, cal: &AxisCalibration, out_min: f64, out_max: f64) -> f64 {
    let clamped = raw.clamp(cal.low, cal.high);
    let fraction = (clamped - cal.low) / (cal.high - cal.low);
    out_min + fraction * (out_max - out_min)
}
