//! # Protocol Module
//!
//! The remote's single outbound protocol artifact and its inbound logging.
//!
//! This module handles:
//! - Encoding stick samples into `D|angle|magnitude|signed` drive commands
//! - Wire constants for the line-oriented serial framing
//! - Splitting received lines into fields for diagnostic logging

pub mod encoder;
pub mod frame;
pub mod wire;

pub use encoder::{encode, Command};
pub use frame::RadioFrame;
