//! # Joystick Module
//!
//! Analog stick handling for the two-stick remote.
//!
//! This module handles:
//! - Per-axis calibration of raw analog readings
//! - Deriving magnitude, angle and quadrant from a calibrated stick sample

pub mod calibration;
pub mod sampler;

pub use calibration::{normalize, AxisCalibration};
pub use sampler::{JoystickChannel, SampledVector, VectorSampler};
