//! # Drive Command Encoder
//!
//! Serializes a left/right stick sample pair into the outbound wire string.
//!
//! ## Format
//!
//! ```text
//! D|<right angle>|<right magnitude>|<signed left magnitude>
//! ```
//!
//! - Right angle: radians, shortest representation that round-trips
//! - Right magnitude: truncated toward zero to an integer
//! - Signed left magnitude: negative when the left stick points into
//!   quadrant 2 or 3
//!
//! Numeric fields never contain `|`, so no escaping is needed.

use std::fmt;

use super::wire::{DRIVE_TAG, FIELD_DELIMITER};
use crate::error::{RemoteError, Result};
use crate::joystick::SampledVector;

/// One encoded transmit-tick command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    /// Returns the wire string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number of bytes on the wire, excluding the line terminator.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Commands are never empty once encoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encodes a drive command from the left and right stick samples.
///
/// # Errors
///
/// Returns [`RemoteError::Encoding`] if any field value is NaN or infinite.
///
/// # Examples
///
/// ```
/// use omnimote::joystick::SampledVector;
/// use omnimote::protocol::encoder::encode;
///
/// let left = SampledVector::from_xy(0.0, -100.0, 0.0);
/// let right = SampledVector {
///     angle_radians: 0.5,
///     magnitude: 42.7,
///     ..SampledVector::ZERO
/// };
///
/// assert_eq!(encode(&left, &right)?.as_str(), "D|0.5|42|-100");
/// # Ok::<(), omnimote::error::RemoteError>(())
/// ```
pub fn encode(left: &SampledVector, right: &SampledVector) -> Result<Command> {
    let angle = finite("right angle", right.angle_radians)?;
    let right_magnitude = finite("right magnitude", right.magnitude)?.trunc() as i64;
    let signed_left = signed_magnitude(left)?;

    Ok(Command(format!(
        "{tag}{d}{angle}{d}{right_magnitude}{d}{signed_left}",
        tag = DRIVE_TAG,
        d = FIELD_DELIMITER,
    )))
}

/// Left-stick magnitude with the quadrant polarity applied.
///
/// # Errors
///
/// Returns [`RemoteError::Encoding`] if the magnitude is not finite.
pub fn signed_magnitude(left: &SampledVector) -> Result<f64> {
    let magnitude = finite("left magnitude", left.magnitude)?;
    if magnitude == 0.0 {
        // Avoid "-0" on the wire
        return Ok(0.0);
    }
    Ok(if left.is_throttle_positive() {
        magnitude
    } else {
        -magnitude
    })
}

fn finite(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RemoteError::Encoding(format!("{} is {}", field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn polar(magnitude: f64, angle_radians: f64, quadrant: u8) -> SampledVector {
        SampledVector {
            magnitude,
            angle_radians,
            quadrant,
            ..SampledVector::ZERO
        }
    }

    // ==================== Format Tests ====================

    #[test]
    fn test_encode_scenario() {
        let left = SampledVector::from_xy(0.0, -100.0, 0.0);
        assert_eq!(left.quadrant, 3);
        let right = polar(42.7, 0.5, 0);

        let command = encode(&left, &right).unwrap();
        assert_eq!(command.as_str(), "D|0.5|42|-100");
        assert_eq!(command.to_string(), "D|0.5|42|-100");
        assert_eq!(command.len(), 13);
        assert!(!command.is_empty());
    }

    #[test]
    fn test_encode_field_layout() {
        let command = encode(&polar(12.5, 1.0, 0), &polar(99.99, PI, 2)).unwrap();
        let fields: Vec<&str> = command.as_str().split('|').collect();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "D");
        assert_eq!(fields[1].parse::<f64>().unwrap(), PI);
        assert_eq!(fields[2], "99");
        assert_eq!(fields[3], "12.5");
    }

    #[test]
    fn test_right_magnitude_truncates() {
        let left = SampledVector::ZERO;
        assert_eq!(encode(&left, &polar(0.99, 0.0, 0)).unwrap().as_str(), "D|0|0|0");
        assert_eq!(encode(&left, &polar(141.42, 0.0, 0)).unwrap().as_str(), "D|0|141|0");
    }

    #[test]
    fn test_zero_left_magnitude_has_no_sign() {
        let left = polar(0.0, 3.0 * FRAC_PI_2, 3);
        let command = encode(&left, &SampledVector::ZERO).unwrap();
        assert_eq!(command.as_str(), "D|0|0|0");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let left = SampledVector::from_xy(-37.25, 81.0, -FRAC_PI_2);
        let right = SampledVector::from_xy(12.0, -3.5, -FRAC_PI_2);

        let first = encode(&left, &right).unwrap();
        for _ in 0..100 {
            assert_eq!(encode(&left, &right).unwrap(), first);
        }
    }

    // ==================== Polarity Law ====================

    #[test]
    fn test_polarity_follows_quadrant() {
        for step in 0..720 {
            let angle = step as f64 * PI / 360.0;
            let left = SampledVector::from_xy(80.0 * angle.cos(), 80.0 * angle.sin(), 0.0);
            let signed = signed_magnitude(&left).unwrap();
            if left.quadrant < 2 {
                assert!(signed >= 0.0, "quadrant {} gave {}", left.quadrant, signed);
            } else {
                assert!(signed <= 0.0, "quadrant {} gave {}", left.quadrant, signed);
            }
            assert!((signed.abs() - left.magnitude).abs() < 1e-9);
        }
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_rejects_nan_angle() {
        let result = encode(&SampledVector::ZERO, &polar(10.0, f64::NAN, 0));
        match result {
            Err(RemoteError::Encoding(msg)) => assert!(msg.contains("right angle")),
            other => panic!("Expected Encoding error, got: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_infinite_magnitudes() {
        assert!(matches!(
            encode(&SampledVector::ZERO, &polar(f64::INFINITY, 0.0, 0)),
            Err(RemoteError::Encoding(_))
        ));
        assert!(matches!(
            encode(&polar(f64::NEG_INFINITY, PI, 2), &SampledVector::ZERO),
            Err(RemoteError::Encoding(_))
        ));
    }
}
