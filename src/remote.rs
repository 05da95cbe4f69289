//! # Remote
//!
//! Wires the stick samplers, button panel and radio link together and owns
//! their lifecycle.
//!
//! ```text
//! Idle --activate()--> Running --dispose()--> Stopped
//!   \____________________dispose()_____________/
//! ```
//!
//! Disposal stops the radio before the tasks are cancelled, so a tick in
//! flight at that moment fails its send with `RadioUnavailable` instead of
//! queueing a command that will never leave.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buttons::{self, ButtonMonitor, DEFAULT_EVENT_CAPACITY};
use crate::config::Config;
use crate::error::{RemoteError, Result};
use crate::input::{AnalogSource, EdgeMode, EdgeSource, ResistorMode};
use crate::joystick::{JoystickChannel, VectorSampler};
use crate::radio::RadioLink;
use crate::transmit::{Pacer, TickSnapshot, TickStats, TransmitLoop};

/// Lifecycle state of a [`Remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

type Subscription = Box<dyn Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The remote control: transmit loop, button monitor and radio session.
pub struct Remote<A: AnalogSource, R: RadioLink, P: Pacer> {
    radio: Arc<R>,
    announce: bool,
    state: Mutex<LoopState>,
    transmit: Mutex<Option<TransmitLoop<A, R, P>>>,
    monitor: Mutex<Option<ButtonMonitor>>,
    subscriptions: Mutex<Vec<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<TickStats>,
    cancel: CancellationToken,
}

impl<A: AnalogSource, R: RadioLink, P: Pacer> Remote<A, R, P> {
    /// Builds the remote from its configuration.
    ///
    /// Subscribes the four buttons on `edges` (rising edge, pull-up) and
    /// installs a receive handler on `radio` that logs incoming frames.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidCalibration`] for a degenerate stick
    /// calibration, or [`RemoteError::Input`] if a button pin cannot be
    /// subscribed.
    pub fn new<E>(
        config: &Config,
        analog: Arc<A>,
        edges: &mut E,
        radio: Arc<R>,
        pacer: P,
    ) -> Result<Self>
    where
        E: EdgeSource,
    {
        let left = JoystickChannel::from_config(&config.left_stick)?;
        let right = JoystickChannel::from_config(&config.right_stick)?;

        let transmit = TransmitLoop::new(
            VectorSampler::new("left", Arc::clone(&analog), left),
            VectorSampler::new("right", analog, right),
            Arc::clone(&radio),
            pacer,
            config.radio.queue_warn_depth,
        );
        let stats = transmit.stats();

        let (sink, monitor) = buttons::channel(DEFAULT_EVENT_CAPACITY);
        let mut subscriptions: Vec<Subscription> = Vec::with_capacity(buttons::BUTTON_COUNT);
        for (button, &pin) in config.input.button_pins.iter().enumerate() {
            let subscription = edges.subscribe(
                pin,
                EdgeMode::Rising,
                ResistorMode::PullUp,
                sink.handler_for(button as u8),
            )?;
            subscriptions.push(Box::new(subscription));
        }
        debug!("Buttons subscribed on pins {:?}", config.input.button_pins);

        radio.on_data_received(Arc::new(|frame| debug!("RECEIVED: {}", frame)));

        Ok(Self {
            radio,
            announce: config.radio.announce,
            state: Mutex::new(LoopState::Idle),
            transmit: Mutex::new(Some(transmit)),
            monitor: Mutex::new(Some(monitor)),
            subscriptions: Mutex::new(subscriptions),
            tasks: Mutex::new(Vec::new()),
            stats,
            cancel: CancellationToken::new(),
        })
    }

    /// Activates the radio and starts the transmit loop and button monitor.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidState`] unless the remote is idle, or
    /// when no runtime is available. Radio activation errors are passed
    /// through and leave the remote idle.
    pub fn activate(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state != LoopState::Idle {
            return Err(RemoteError::InvalidState(format!(
                "remote cannot be activated while {:?}",
                *state
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RemoteError::InvalidState(format!("no async runtime: {}", e)))?;

        let (transmit, monitor) = match (lock(&self.transmit).take(), lock(&self.monitor).take()) {
            (Some(transmit), Some(monitor)) => (transmit, monitor),
            _ => return Err(RemoteError::InvalidState("remote already started".to_string())),
        };

        if let Err(e) = self.radio.activate(self.announce) {
            *lock(&self.transmit) = Some(transmit);
            *lock(&self.monitor) = Some(monitor);
            return Err(e);
        }

        transmit.report_positions();

        let mut tasks = lock(&self.tasks);
        let cancel = self.cancel.clone();
        tasks.push(runtime.spawn(async move {
            monitor.run(cancel).await;
        }));
        tasks.push(runtime.spawn(transmit.run(self.cancel.clone())));

        *state = LoopState::Running;
        info!("Remote running");
        Ok(())
    }

    /// Stops the remote. Idempotent and callable from any thread.
    pub fn dispose(&self) {
        {
            let mut state = lock(&self.state);
            if *state == LoopState::Stopped {
                return;
            }
            *state = LoopState::Stopped;
        }

        self.radio.dispose();
        self.cancel.cancel();
        lock(&self.subscriptions).clear();
        info!("Remote disposed");
    }

    /// Waits for the spawned tasks to finish. Returns immediately if the
    /// remote was never activated.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *lock(&self.tasks));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Remote task ended abnormally: {}", e);
            }
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LoopState {
        *lock(&self.state)
    }

    /// Returns the tick counters so far.
    pub fn stats(&self) -> TickSnapshot {
        self.stats.snapshot()
    }
}

impl<A: AnalogSource, R: RadioLink, P: Pacer> Drop for Remote<A, R, P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
