//! # Radio Module
//!
//! Queue-backed radio link to the paired receiver.
//!
//! This module handles:
//! - The [`RadioLink`] interface the transmit loop sends through
//! - A serial radio modem adapter with a bounded drop-oldest send queue
//! - Delivering received frames to a diagnostic handler

pub mod serial;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{Command, RadioFrame};

pub use serial::SerialRadio;

/// Callback for frames received from the partner.
pub type DataReceivedHandler = Arc<dyn Fn(RadioFrame) + Send + Sync>;

/// Outbound radio link.
///
/// Implementations synchronize internally; every method may be called
/// concurrently from any task or thread.
pub trait RadioLink: Send + Sync + 'static {
    /// Starts the link. When `announce` is set, an identification frame is
    /// transmitted before any command.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RemoteError::InvalidState`] if the link was
    /// already activated or disposed.
    fn activate(&self, announce: bool) -> Result<()>;

    /// Queues a command for transmission without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RemoteError::RadioUnavailable`] if the link
    /// is not active.
    fn send(&self, command: &Command) -> Result<()>;

    /// Number of commands waiting to be transmitted.
    fn queue_depth(&self) -> usize;

    /// Configured pause between transmitted frames.
    fn send_interval(&self) -> Duration;

    /// Installs the handler for received frames, replacing any previous one.
    fn on_data_received(&self, handler: DataReceivedHandler);

    /// Stops the link and releases the port. Idempotent.
    fn dispose(&self);
}

/// Identity and cadence of a radio session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioSettings {
    pub id: String,
    pub partner_id: String,
    pub send_interval: Duration,
    pub queue_capacity: usize,
}
