//! # Input Module
//!
//! Narrow interfaces to the analog and digital input hardware.
//!
//! This module handles:
//! - Raw analog reads for the four stick axes ([`AnalogSource`])
//! - Edge-triggered digital inputs for the button panel ([`EdgeSource`])
//! - Concrete adapters: Linux IIO sysfs ADCs, a software edge source with a
//!   glitch filter, and Raspberry Pi GPIO (feature `gpio`)

pub mod analog;
pub mod edge;
#[cfg(feature = "gpio")]
pub mod gpio;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;

/// Source of raw analog readings, one value per channel.
#[cfg_attr(test, mockall::automock)]
pub trait AnalogSource: Send + Sync + 'static {
    /// Reads the current raw value of `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RemoteError::SensorReadFailure`] if the
    /// channel cannot be read.
    fn read_raw(&self, channel: u8) -> Result<f64>;
}

/// Which transitions fire an edge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    Rising,
    Falling,
    Both,
}

/// Internal bias resistor applied to an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResistorMode {
    Disabled,
    PullUp,
    PullDown,
}

/// Logic level of a pin after an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl std::fmt::Display for PinLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single edge as reported by an [`EdgeSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub pin: u8,
    pub level: PinLevel,
    pub timestamp: DateTime<Utc>,
}

/// Callback invoked from the edge source's delivery context.
///
/// Must return quickly and must not block.
pub type EdgeHandler = Arc<dyn Fn(EdgeEvent) + Send + Sync>;

/// Source of edge-triggered digital input events.
///
/// The glitch filter is part of each implementation's construction config;
/// edges shorter than the filter width never reach a handler.
pub trait EdgeSource {
    /// Handle that keeps the subscription alive; dropping it unsubscribes.
    type Subscription: Send + 'static;

    /// Registers `handler` for edges on `pin`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RemoteError::Input`] if the pin cannot be
    /// configured or is already subscribed.
    fn subscribe(
        &mut self,
        pin: u8,
        edge: EdgeMode,
        resistor: ResistorMode,
        handler: EdgeHandler,
    ) -> Result<Self::Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_level_display() {
        assert_eq!(PinLevel::High.to_string(), "high");
        assert_eq!(PinLevel::Low.to_string(), "low");
    }

    #[test]
    fn test_mock_analog_source() {
        let mut source = MockAnalogSource::new();
        source.expect_read_raw().returning(|channel| Ok(channel as f64 * 1.5));

        assert_eq!(source.read_raw(2).unwrap(), 3.0);
    }
}
