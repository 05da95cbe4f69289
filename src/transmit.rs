//! # Transmit Loop
//!
//! The periodic driver: every tick samples both sticks, encodes a drive
//! command, hands it to the radio link and then pauses for the link's send
//! interval.
//!
//! ## Failure Handling
//!
//! | Error | Effect |
//! |-------|--------|
//! | `SensorReadFailure` | logged, nothing sent this tick |
//! | `Encoding` | logged, nothing sent this tick |
//! | `RadioUnavailable` | logged, loop continues |
//!
//! No error ends the loop; only cancellation does.
//!
//! ## Backpressure
//!
//! The loop never waits on the radio queue. Queue depth is read after each
//! send and reported when it reaches the warning threshold; overflow policy
//! belongs to the radio link.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::input::AnalogSource;
use crate::joystick::VectorSampler;
use crate::protocol::{encode, Command};
use crate::radio::RadioLink;

/// Number of ticks between status log messages (one minute at 200 ms)
pub const STATUS_LOG_INTERVAL_TICKS: u64 = 300;

/// Pause between ticks.
#[async_trait]
pub trait Pacer: Send + Sync + 'static {
    /// Waits for `interval` before the next tick.
    async fn pause(&self, interval: Duration);
}

/// Production pacer backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Outcome of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Command handed to the radio link
    Sent(Command),
    /// Sampling or encoding failed; nothing was sent
    Skipped,
    /// The radio link refused the command
    SendFailed,
}

/// Running tick counters, shared with the lifecycle owner.
#[derive(Debug, Default)]
pub struct TickStats {
    sent: AtomicU64,
    skipped: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of [`TickStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSnapshot {
    pub sent: u64,
    pub skipped: u64,
    pub send_failures: u64,
}

impl TickSnapshot {
    /// Total ticks run.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.sent + self.skipped + self.send_failures
    }
}

impl TickStats {
    /// Returns the current counter values.
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    fn record(&self, outcome: &TickOutcome) {
        let counter = match outcome {
            TickOutcome::Sent(_) => &self.sent,
            TickOutcome::Skipped => &self.skipped,
            TickOutcome::SendFailed => &self.send_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Samples, encodes and sends one command per tick.
pub struct TransmitLoop<A: AnalogSource, R: RadioLink, P: Pacer> {
    left: VectorSampler<A>,
    right: VectorSampler<A>,
    radio: Arc<R>,
    pacer: P,
    stats: Arc<TickStats>,
    queue_warn_depth: usize,
}

impl<A: AnalogSource, R: RadioLink, P: Pacer> TransmitLoop<A, R, P> {
    /// Creates a loop over the two stick samplers.
    pub fn new(
        left: VectorSampler<A>,
        right: VectorSampler<A>,
        radio: Arc<R>,
        pacer: P,
        queue_warn_depth: usize,
    ) -> Self {
        Self {
            left,
            right,
            radio,
            pacer,
            stats: Arc::new(TickStats::default()),
            queue_warn_depth: queue_warn_depth.max(1),
        }
    }

    /// Shared handle to the tick counters.
    pub fn stats(&self) -> Arc<TickStats> {
        Arc::clone(&self.stats)
    }

    /// Logs where both sticks rest before the first tick.
    pub fn report_positions(&self) {
        for sampler in [&self.left, &self.right] {
            let v = sampler.sample_or_zero();
            info!(
                "{} stick at x={:.1} y={:.1} (angle {:.3}, magnitude {:.1})",
                sampler.name(),
                v.x,
                v.y,
                v.angle_radians,
                v.magnitude
            );
        }
    }

    /// Samples both sticks and encodes the command for this tick.
    ///
    /// # Errors
    ///
    /// Returns `SensorReadFailure` or `Encoding` errors from the pipeline.
    pub fn build_command(&self) -> Result<Command> {
        let left = self.left.sample()?;
        let right = self.right.sample()?;

        debug!(
            "LEFT x={:.1} y={:.1} q={} angle={:.3} mag={:.1}  RIGHT x={:.1} y={:.1} q={} angle={:.3} mag={:.1}",
            left.x, left.y, left.quadrant, left.angle_radians, left.magnitude,
            right.x, right.y, right.quadrant, right.angle_radians, right.magnitude,
        );

        encode(&left, &right)
    }

    /// Runs one tick without pausing. Never fails; the outcome is recorded
    /// in the tick counters.
    pub fn tick(&self) -> TickOutcome {
        let outcome = match self.build_command() {
            Err(e) => {
                warn!("Skipping tick: {}", e);
                TickOutcome::Skipped
            }
            Ok(command) => match self.radio.send(&command) {
                Ok(()) => {
                    let depth = self.radio.queue_depth();
                    if depth >= self.queue_warn_depth {
                        warn!("Radio queue depth {} (sending {})", depth, command);
                    } else {
                        debug!("Queued {} (queue depth {})", command, depth);
                    }
                    TickOutcome::Sent(command)
                }
                Err(e) => {
                    warn!("Failed to send {}: {}", command, e);
                    TickOutcome::SendFailed
                }
            },
        };

        self.stats.record(&outcome);
        outcome
    }

    /// Ticks until `cancel` fires.
    ///
    /// Cancellation is observed before each tick and during the pause, so a
    /// tick is never interrupted between sampling and sending.
    pub async fn run(self, cancel: CancellationToken) {
        let interval = self.radio.send_interval();
        info!("Transmit loop running every {} ms", interval.as_millis());

        let mut last_status: u64 = 0;
        while !cancel.is_cancelled() {
            self.tick();

            let snapshot = self.stats.snapshot();
            if snapshot.ticks() - last_status >= STATUS_LOG_INTERVAL_TICKS {
                info!(
                    "Transmitted {} commands ({} skipped, {} send failures)",
                    snapshot.sent, snapshot.skipped, snapshot.send_failures
                );
                last_status = snapshot.ticks();
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.pacer.pause(interval) => {}
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            "Transmit loop stopped: {} sent, {} skipped, {} send failures",
            snapshot.sent, snapshot.skipped, snapshot.send_failures
        );
    }
}
