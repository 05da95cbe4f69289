//! Raspberry Pi GPIO edge source (feature `gpio`).
//!
//! Uses `rppal` asynchronous interrupts. The glitch filter maps onto the
//! interrupt debounce window, so handlers only see filtered edges.

use chrono::Utc;
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use std::time::Duration;
use tracing::{debug, info};

use super::{EdgeEvent, EdgeHandler, EdgeMode, EdgeSource, PinLevel, ResistorMode};
use crate::error::{RemoteError, Result};

/// Edge source backed by the Raspberry Pi GPIO controller.
pub struct GpioEdgeSource {
    gpio: Gpio,
    glitch_filter: Duration,
}

impl GpioEdgeSource {
    /// Opens the GPIO controller with the given glitch filter width.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Input`] if `/dev/gpiomem` cannot be opened.
    pub fn open(glitch_filter: Duration) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| RemoteError::Input(format!("Failed to open GPIO: {}", e)))?;
        info!("GPIO opened (glitch filter {} ms)", glitch_filter.as_millis());
        Ok(Self { gpio, glitch_filter })
    }
}

/// Keeps the interrupt armed; dropping the pin clears it.
pub struct GpioSubscription {
    _pin: InputPin,
}

impl EdgeSource for GpioEdgeSource {
    type Subscription = GpioSubscription;

    fn subscribe(
        &mut self,
        pin: u8,
        edge: EdgeMode,
        resistor: ResistorMode,
        handler: EdgeHandler,
    ) -> Result<GpioSubscription> {
        let raw = self
            .gpio
            .get(pin)
            .map_err(|e| RemoteError::Input(format!("Failed to claim pin {}: {}", pin, e)))?;

        let mut input = match resistor {
            ResistorMode::Disabled => raw.into_input(),
            ResistorMode::PullUp => raw.into_input_pullup(),
            ResistorMode::PullDown => raw.into_input_pulldown(),
        };

        let trigger = match edge {
            EdgeMode::Rising => Trigger::RisingEdge,
            EdgeMode::Falling => Trigger::FallingEdge,
            EdgeMode::Both => Trigger::Both,
        };

        input
            .set_async_interrupt(trigger, Some(self.glitch_filter), move |event: Event| {
                let level = match event.trigger {
                    Trigger::FallingEdge => PinLevel::Low,
                    _ => PinLevel::High,
                };
                handler(EdgeEvent {
                    pin,
                    level,
                    timestamp: Utc::now(),
                });
            })
            .map_err(|e| RemoteError::Input(format!("Failed to arm interrupt on pin {}: {}", pin, e)))?;

        debug!("Armed GPIO interrupt on pin {} ({:?}, {:?})", pin, edge, resistor);
        Ok(GpioSubscription { _pin: input })
    }
}
