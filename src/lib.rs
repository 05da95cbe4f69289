//! # Omnimote Library
//!
//! Control loop of a handheld twin-joystick remote.
//!
//! Two analog sticks are sampled on a fixed cadence, converted into polar
//! form and encoded into a compact drive command that is handed to a serial
//! radio modem. A four-button panel is monitored for diagnostics.

pub mod buttons;
pub mod config;
pub mod error;
pub mod input;
pub mod joystick;
pub mod protocol;
pub mod radio;
pub mod remote;
pub mod transmit;
