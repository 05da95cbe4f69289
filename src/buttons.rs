//! # Button Monitor
//!
//! Observes the four-button panel for diagnostics.
//!
//! Edge handlers run in the edge source's delivery context (a GPIO interrupt
//! thread on hardware), so they only post a [`ButtonEvent`] into a bounded
//! channel and return. A [`ButtonMonitor`] task drains the channel and logs
//! each event. Buttons never influence the transmitted command.
//!
//! No debouncing happens here; the edge source's glitch filter is trusted.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::input::{EdgeHandler, PinLevel};

/// Number of buttons on the panel
pub const BUTTON_COUNT: usize = 4;

/// Default depth of the button event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// One observed button edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Logical button id (0-3)
    pub button: u8,
    /// Input pin the edge arrived on
    pub pin: u8,
    pub level: PinLevel,
    pub timestamp: DateTime<Utc>,
}

/// Creates a connected sink/monitor pair with room for `capacity` events.
pub fn channel(capacity: usize) -> (ButtonSink, ButtonMonitor) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ButtonSink {
            sender,
            dropped: Arc::clone(&dropped),
        },
        ButtonMonitor { receiver, dropped },
    )
}

/// Non-blocking entry point called from edge handlers.
#[derive(Debug, Clone)]
pub struct ButtonSink {
    sender: mpsc::Sender<ButtonEvent>,
    dropped: Arc<AtomicU64>,
}

impl ButtonSink {
    /// Posts an edge for `button`. Never blocks.
    ///
    /// Returns false if the event was dropped because the queue is full or
    /// the monitor has stopped.
    pub fn on_edge(&self, button: u8, pin: u8, level: PinLevel, timestamp: DateTime<Utc>) -> bool {
        let event = ButtonEvent {
            button,
            pin,
            level,
            timestamp,
        };
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Builds the edge handler for logical `button`.
    pub fn handler_for(&self, button: u8) -> EdgeHandler {
        let sink = self.clone();
        Arc::new(move |edge| {
            sink.on_edge(button, edge.pin, edge.level, edge.timestamp);
        })
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Drains button events and logs them.
#[derive(Debug)]
pub struct ButtonMonitor {
    receiver: mpsc::Receiver<ButtonEvent>,
    dropped: Arc<AtomicU64>,
}

impl ButtonMonitor {
    /// Logs events until cancelled or every sink is gone.
    ///
    /// Returns the number of events logged.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut handled = 0u64;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.receiver.recv() => event,
            };

            let Some(event) = event else {
                debug!("All button sinks closed");
                break;
            };

            match event.level {
                PinLevel::High => info!("Button #{} pushed! {}", event.button, event.timestamp),
                PinLevel::Low => info!("Button #{} released {}", event.button, event.timestamp),
            }
            handled += 1;
        }

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("{} button events dropped (queue full)", dropped);
        }
        debug!("Button monitor stopped after {} events", handled);
        handled
    }
}
