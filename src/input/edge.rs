//! Software edge source.
//!
//! Delivers edges pushed through an [`EdgeInjector`] to subscribed handlers,
//! applying the same glitch filter the hardware sources apply: after an
//! accepted edge, further edges on that pin are suppressed until the filter
//! width has elapsed. Used on hosts without GPIO and in tests.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

use super::{EdgeEvent, EdgeHandler, EdgeMode, EdgeSource, PinLevel, ResistorMode};
use crate::error::{RemoteError, Result};

struct PinEntry {
    edge: EdgeMode,
    handler: EdgeHandler,
    last_accepted: Option<DateTime<Utc>>,
}

type PinTable = Arc<Mutex<HashMap<u8, PinEntry>>>;

/// Edge source fed by software.
pub struct SoftwareEdgeSource {
    glitch_filter: Duration,
    pins: PinTable,
}

impl SoftwareEdgeSource {
    /// Creates a source with the given glitch filter width.
    pub fn new(glitch_filter: Duration) -> Self {
        Self {
            glitch_filter,
            pins: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a handle that pushes level changes into this source.
    pub fn injector(&self) -> EdgeInjector {
        EdgeInjector {
            glitch_filter: self.glitch_filter,
            pins: Arc::clone(&self.pins),
        }
    }

    /// Returns the configured glitch filter width.
    pub fn glitch_filter(&self) -> Duration {
        self.glitch_filter
    }
}

impl EdgeSource for SoftwareEdgeSource {
    type Subscription = SoftwareSubscription;

    fn subscribe(
        &mut self,
        pin: u8,
        edge: EdgeMode,
        resistor: ResistorMode,
        handler: EdgeHandler,
    ) -> Result<SoftwareSubscription> {
        let mut pins = self
            .pins
            .lock()
            .map_err(|_| RemoteError::Input("edge table poisoned".to_string()))?;

        if pins.contains_key(&pin) {
            return Err(RemoteError::Input(format!("pin {} already subscribed", pin)));
        }

        debug!("Subscribed pin {} ({:?}, {:?})", pin, edge, resistor);
        pins.insert(
            pin,
            PinEntry {
                edge,
                handler,
                last_accepted: None,
            },
        );

        Ok(SoftwareSubscription {
            pin,
            pins: Arc::clone(&self.pins),
        })
    }
}

/// Keeps a software pin subscribed until dropped.
pub struct SoftwareSubscription {
    pin: u8,
    pins: PinTable,
}

impl SoftwareSubscription {
    /// Returns the subscribed pin.
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl Drop for SoftwareSubscription {
    fn drop(&mut self) {
        if let Ok(mut pins) = self.pins.lock() {
            pins.remove(&self.pin);
        }
    }
}

/// Pushes level changes into a [`SoftwareEdgeSource`].
#[derive(Clone)]
pub struct EdgeInjector {
    glitch_filter: Duration,
    pins: PinTable,
}

impl EdgeInjector {
    /// Reports that `pin` changed to `level` at `timestamp`.
    ///
    /// Returns true if the edge passed the mode and glitch filters and was
    /// delivered to a handler.
    pub fn inject(&self, pin: u8, level: PinLevel, timestamp: DateTime<Utc>) -> bool {
        let handler = {
            let Ok(mut pins) = self.pins.lock() else {
                return false;
            };
            let Some(entry) = pins.get_mut(&pin) else {
                return false;
            };

            let wanted = match entry.edge {
                EdgeMode::Rising => level == PinLevel::High,
                EdgeMode::Falling => level == PinLevel::Low,
                EdgeMode::Both => true,
            };
            if !wanted {
                return false;
            }

            if let Some(last) = entry.last_accepted {
                // Out-of-order timestamps fail to_std() and are treated as glitches.
                let settled = (timestamp - last)
                    .to_std()
                    .map_or(false, |elapsed| elapsed >= self.glitch_filter);
                if !settled {
                    trace!("Suppressed glitch on pin {}", pin);
                    return false;
                }
            }
            entry.last_accepted = Some(timestamp);
            Arc::clone(&entry.handler)
        };

        // Handler runs outside the lock so it may re-enter the source.
        handler(EdgeEvent {
            pin,
            level,
            timestamp,
        });
        true
    }
}
