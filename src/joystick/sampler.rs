//! # Vector Sampler
//!
//! Reads both axes of one stick, calibrates them and derives the polar
//! representation used by the command encoder.
//!
//! ## Angle and Quadrant
//!
//! The angle is `atan2(y, x)` plus the channel's angular offset, normalized
//! into `[0, 2π)`. The quadrant is the 90° sector the angle falls in:
//!
//! | Quadrant | Angle range | Throttle polarity |
//! |----------|-------------|-------------------|
//! | 0 | `[0, π/2)` | positive |
//! | 1 | `[π/2, π)` | positive |
//! | 2 | `[π, 3π/2)` | negative |
//! | 3 | `[3π/2, 2π)` | negative |
//!
//! Each boundary angle belongs to the sector it opens.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;
use tracing::warn;

use super::calibration::{normalize, AxisCalibration};
use crate::config::StickConfig;
use crate::error::{RemoteError, Result};
use crate::input::AnalogSource;

/// Immutable description of one joystick.
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickChannel {
    x_channel: u8,
    y_channel: u8,
    x_calibration: AxisCalibration,
    y_calibration: AxisCalibration,
    angular_offset: f64,
    output_min: f64,
    output_max: f64,
}

impl JoystickChannel {
    /// Creates a channel description.
    ///
    /// # Arguments
    ///
    /// * `x_channel`, `y_channel` - Analog channel ids of the two axes
    /// * `x_calibration`, `y_calibration` - Raw bounds of each axis
    /// * `angular_offset` - Rotation added to every sampled angle, in radians
    /// * `output_range` - `(min, max)` both axes are scaled into
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidCalibration`] if the output range is
    /// empty or not finite, or the offset is not finite.
    pub fn new(
        x_channel: u8,
        y_channel: u8,
        x_calibration: AxisCalibration,
        y_calibration: AxisCalibration,
        angular_offset: f64,
        output_range: (f64, f64),
    ) -> Result<Self> {
        let (output_min, output_max) = output_range;
        if !output_min.is_finite() || !output_max.is_finite() || output_min >= output_max {
            return Err(RemoteError::InvalidCalibration {
                low: output_min,
                high: output_max,
            });
        }
        if !angular_offset.is_finite() {
            return Err(RemoteError::InvalidCalibration {
                low: angular_offset,
                high: angular_offset,
            });
        }

        Ok(Self {
            x_channel,
            y_channel,
            x_calibration,
            y_calibration,
            angular_offset,
            output_min,
            output_max,
        })
    }

    /// Builds a channel from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidCalibration`] for degenerate axis
    /// bounds or output range.
    pub fn from_config(config: &StickConfig) -> Result<Self> {
        Self::new(
            config.x_channel,
            config.y_channel,
            AxisCalibration::new(config.x_low, config.x_high)?,
            AxisCalibration::new(config.y_low, config.y_high)?,
            config.angular_offset_deg.to_radians(),
            (config.output_min, config.output_max),
        )
    }

    /// Returns the angular offset in radians.
    #[must_use]
    pub fn angular_offset(&self) -> f64 {
        self.angular_offset
    }

    /// Returns the `(min, max)` output range.
    #[must_use]
    pub fn output_range(&self) -> (f64, f64) {
        (self.output_min, self.output_max)
    }
}

/// One calibrated stick sample in cartesian and polar form.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampledVector {
    pub x: f64,
    pub y: f64,
    pub magnitude: f64,
    pub angle_radians: f64,
    pub quadrant: u8,
}

impl SampledVector {
    /// The centered stick.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        magnitude: 0.0,
        angle_radians: 0.0,
        quadrant: 0,
    };

    /// Derives the polar form of `(x, y)` rotated by `angular_offset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use omnimote::joystick::sampler::SampledVector;
    ///
    /// let v = SampledVector::from_xy(0.0, -100.0, 0.0);
    /// assert_eq!(v.magnitude, 100.0);
    /// assert_eq!(v.quadrant, 3);
    /// assert!(!v.is_throttle_positive());
    /// ```
    #[must_use]
    pub fn from_xy(x: f64, y: f64, angular_offset: f64) -> Self {
        let angle_radians = normalize_angle(y.atan2(x) + angular_offset);
        Self {
            x,
            y,
            magnitude: x.hypot(y),
            angle_radians,
            quadrant: quadrant_of(angle_radians),
        }
    }

    /// Quadrants 0 and 1 drive forward, 2 and 3 drive in reverse.
    #[must_use]
    pub fn is_throttle_positive(&self) -> bool {
        self.quadrant < 2
    }
}

/// Wraps any finite angle into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(radians: f64) -> f64 {
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Returns the 90° sector (0..=3) of an angle in `[0, 2π)`.
#[must_use]
pub fn quadrant_of(angle_radians: f64) -> u8 {
    ((angle_radians / FRAC_PI_2) as u8).min(3)
}

/// Samples one joystick from an analog source.
pub struct VectorSampler<A: AnalogSource> {
    name: &'static str,
    source: Arc<A>,
    channel: JoystickChannel,
}

impl<A: AnalogSource> VectorSampler<A> {
    /// Creates a sampler; `name` labels log lines ("left", "right").
    pub fn new(name: &'static str, source: Arc<A>, channel: JoystickChannel) -> Self {
        Self {
            name,
            source,
            channel,
        }
    }

    /// Returns the sampler's label.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the channel this sampler reads.
    pub fn channel(&self) -> &JoystickChannel {
        &self.channel
    }

    /// Reads and calibrates both axes.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::SensorReadFailure`] if either axis cannot be
    /// read. No vector is produced for that sample.
    pub fn sample(&self) -> Result<SampledVector> {
        let ch = &self.channel;
        let raw_x = self.source.read_raw(ch.x_channel)?;
        let raw_y = self.source.read_raw(ch.y_channel)?;

        let x = normalize(raw_x, &ch.x_calibration, ch.output_min, ch.output_max);
        let y = normalize(raw_y, &ch.y_calibration, ch.output_min, ch.output_max);

        Ok(SampledVector::from_xy(x, y, ch.angular_offset))
    }

    /// Like [`sample`](Self::sample), but substitutes the centered vector on
    /// a read failure after logging it.
    pub fn sample_or_zero(&self) -> SampledVector {
        self.sample().unwrap_or_else(|e| {
            warn!("{} stick: {}; using centered vector", self.name, e);
            SampledVector::ZERO
        })
    }
}
