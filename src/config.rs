//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; missing sections and fields fall back to the
//! values of the reference hardware build. Axis calibration bounds are not
//! checked here: a degenerate axis is rejected when the joystick channel is
//! constructed.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{RemoteError, Result};
use crate::input::analog::DEFAULT_IIO_DEVICE;
use crate::radio::RadioSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default = "default_left_stick")]
    pub left_stick: StickConfig,

    #[serde(default = "default_right_stick")]
    pub right_stick: StickConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Radio link configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RadioConfig {
    #[serde(default = "default_radio_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_radio_id")]
    pub id: String,

    #[serde(default = "default_partner_id")]
    pub partner_id: String,

    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_queue_warn_depth")]
    pub queue_warn_depth: usize,

    #[serde(default)]
    pub announce: bool,
}

/// Input hardware configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InputConfig {
    #[serde(default = "default_analog_device")]
    pub analog_device: String,

    #[serde(default = "default_edge_backend")]
    pub edge_backend: String,

    #[serde(default = "default_glitch_filter_ms")]
    pub glitch_filter_ms: u64,

    #[serde(default = "default_button_pins")]
    pub button_pins: [u8; 4],
}

/// One joystick: analog channels, raw axis bounds and output scaling
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StickConfig {
    pub x_channel: u8,
    pub y_channel: u8,
    pub x_low: f64,
    pub x_high: f64,
    pub y_low: f64,
    pub y_high: f64,

    #[serde(default = "default_angular_offset_deg")]
    pub angular_offset_deg: f64,

    #[serde(default = "default_output_min")]
    pub output_min: f64,

    #[serde(default = "default_output_max")]
    pub output_max: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; empty disables file logging
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_radio_port() -> String { "/dev/ttyS0".to_string() }
fn default_baud_rate() -> u32 { 115_200 }
fn default_radio_id() -> String { "OM1".to_string() }
fn default_partner_id() -> String { "OC1".to_string() }
fn default_send_interval_ms() -> u64 { 200 }
fn default_queue_capacity() -> usize { 16 }
fn default_queue_warn_depth() -> usize { 8 }

fn default_analog_device() -> String { DEFAULT_IIO_DEVICE.to_string() }
fn default_edge_backend() -> String { "software".to_string() }
fn default_glitch_filter_ms() -> u64 { 500 }
fn default_button_pins() -> [u8; 4] { [12, 13, 2, 3] }

fn default_angular_offset_deg() -> f64 { -90.0 }
fn default_output_min() -> f64 { -100.0 }
fn default_output_max() -> f64 { 100.0 }

fn default_left_stick() -> StickConfig {
    StickConfig {
        x_channel: 1,
        y_channel: 0,
        x_low: 0.0,
        x_high: 3.0,
        y_low: -4.0,
        y_high: 7.0,
        angular_offset_deg: default_angular_offset_deg(),
        output_min: default_output_min(),
        output_max: default_output_max(),
    }
}

fn default_right_stick() -> StickConfig {
    StickConfig {
        x_channel: 3,
        y_channel: 2,
        x_low: 0.0,
        x_high: 9.0,
        y_low: -6.0,
        y_high: 6.0,
        angular_offset_deg: default_angular_offset_deg(),
        output_min: default_output_min(),
        output_max: default_output_max(),
    }
}

fn default_log_level() -> String { "info".to_string() }

/// Supported serial baud rates for the radio modem
const VALID_BAUD_RATES: [u32; 5] = [9_600, 19_200, 38_400, 57_600, 115_200];

/// Number of analog channels on the stick ADC
const ANALOG_CHANNELS: u8 = 4;

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            port: default_radio_port(),
            baud_rate: default_baud_rate(),
            id: default_radio_id(),
            partner_id: default_partner_id(),
            send_interval_ms: default_send_interval_ms(),
            queue_capacity: default_queue_capacity(),
            queue_warn_depth: default_queue_warn_depth(),
            announce: false,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            analog_device: default_analog_device(),
            edge_backend: default_edge_backend(),
            glitch_filter_ms: default_glitch_filter_ms(),
            button_pins: default_button_pins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radio: RadioConfig::default(),
            input: InputConfig::default(),
            left_stick: default_left_stick(),
            right_stick: default_right_stick(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RadioConfig {
    /// Session settings handed to the radio link.
    #[must_use]
    pub fn settings(&self) -> RadioSettings {
        RadioSettings {
            id: self.id.clone(),
            partner_id: self.partner_id.clone(),
            send_interval: Duration::from_millis(self.send_interval_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl InputConfig {
    /// Glitch filter width applied by the edge source.
    #[must_use]
    pub fn glitch_filter(&self) -> Duration {
        Duration::from_millis(self.glitch_filter_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> RemoteError {
    RemoteError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use omnimote::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Examples
    ///
    /// ```
    /// use omnimote::config::Config;
    ///
    /// let config = Config::from_toml_str("[radio]\nsend_interval_ms = 100\n")?;
    /// assert_eq!(config.radio.send_interval_ms, 100);
    /// assert_eq!(config.radio.id, "OM1");
    /// # Ok::<(), omnimote::error::RemoteError>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let radio = &self.radio;

        if radio.port.is_empty() {
            return Err(invalid("radio port cannot be empty"));
        }

        for (name, value) in [("id", &radio.id), ("partner_id", &radio.partner_id)] {
            if value.is_empty() || value.contains('|') || !value.is_ascii() {
                return Err(invalid(format!(
                    "radio {} must be non-empty ASCII without '|'",
                    name
                )));
            }
        }

        if !VALID_BAUD_RATES.contains(&radio.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if radio.send_interval_ms == 0 || radio.send_interval_ms > 60000 {
            return Err(invalid("send_interval_ms must be between 1 and 60000"));
        }

        if radio.queue_capacity == 0 || radio.queue_capacity > 1024 {
            return Err(invalid("queue_capacity must be between 1 and 1024"));
        }

        if radio.queue_warn_depth == 0 || radio.queue_warn_depth > radio.queue_capacity {
            return Err(invalid(
                "queue_warn_depth must be between 1 and queue_capacity",
            ));
        }

        if !["software", "gpio"].contains(&self.input.edge_backend.as_str()) {
            return Err(invalid("edge_backend must be 'software' or 'gpio'"));
        }

        if self.input.glitch_filter_ms > 10000 {
            return Err(invalid("glitch_filter_ms must be between 0 and 10000"));
        }

        let pins: HashSet<u8> = self.input.button_pins.iter().copied().collect();
        if pins.len() != self.input.button_pins.len() {
            return Err(invalid("button_pins must be distinct"));
        }

        let mut channels = HashSet::new();
        for (name, stick) in [("left_stick", &self.left_stick), ("right_stick", &self.right_stick)] {
            for channel in [stick.x_channel, stick.y_channel] {
                if channel >= ANALOG_CHANNELS {
                    return Err(invalid(format!(
                        "{} channel {} is out of bounds (must be 0-3)",
                        name, channel
                    )));
                }
                if !channels.insert(channel) {
                    return Err(invalid(format!(
                        "{} reuses analog channel {}",
                        name, channel
                    )));
                }
            }

            if !stick.angular_offset_deg.is_finite() {
                return Err(invalid(format!("{} angular_offset_deg must be finite", name)));
            }
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_radio_port(), "/dev/ttyS0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_radio_id(), "OM1");
        assert_eq!(default_partner_id(), "OC1");
        assert_eq!(default_send_interval_ms(), 200);
        assert_eq!(default_queue_capacity(), 16);
        assert_eq!(default_queue_warn_depth(), 8);
        assert_eq!(default_analog_device(), "/sys/bus/iio/devices/iio:device0");
        assert_eq!(default_edge_backend(), "software");
        assert_eq!(default_glitch_filter_ms(), 500);
        assert_eq!(default_button_pins(), [12, 13, 2, 3]);
        assert_eq!(default_angular_offset_deg(), -90.0);
        assert_eq!(default_output_min(), -100.0);
        assert_eq!(default_output_max(), 100.0);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_default_sticks() {
        let config = create_valid_config();
        assert_eq!(config.left_stick.x_channel, 1);
        assert_eq!(config.left_stick.y_channel, 0);
        assert_eq!((config.left_stick.y_low, config.left_stick.y_high), (-4.0, 7.0));
        assert_eq!(config.right_stick.x_channel, 3);
        assert_eq!((config.right_stick.x_low, config.right_stick.x_high), (0.0, 9.0));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_section() {
        let config = Config::from_toml_str(
            r#"
            [radio]
            port = "/dev/ttyUSB1"
            announce = true

            [right_stick]
            x_channel = 3
            y_channel = 2
            x_low = 10.0
            x_high = 1000.0
            y_low = 10.0
            y_high = 1000.0
            angular_offset_deg = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.radio.port, "/dev/ttyUSB1");
        assert!(config.radio.announce);
        assert_eq!(config.radio.send_interval_ms, 200);
        assert_eq!(config.right_stick.x_high, 1000.0);
        assert_eq!(config.right_stick.angular_offset_deg, 0.0);
        assert_eq!(config.right_stick.output_max, 100.0);
        assert_eq!(config.left_stick, default_left_stick());
    }

    #[test]
    fn test_stick_section_requires_bounds() {
        let result = Config::from_toml_str("[left_stick]\nx_channel = 1\ny_channel = 0\n");
        assert!(matches!(result, Err(RemoteError::Config(_))));
    }

    #[test]
    fn test_radio_settings() {
        let settings = create_valid_config().radio.settings();
        assert_eq!(settings.id, "OM1");
        assert_eq!(settings.partner_id, "OC1");
        assert_eq!(settings.send_interval, Duration::from_millis(200));
        assert_eq!(settings.queue_capacity, 16);
    }

    #[test]
    fn test_glitch_filter_duration() {
        assert_eq!(
            create_valid_config().input.glitch_filter(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"\ndirectory = \"./logs\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.directory, "./logs");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/omnimote.toml");
        assert!(matches!(result, Err(RemoteError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[radio\nport = ").unwrap();
        assert!(matches!(Config::load(file.path()), Err(RemoteError::Config(_))));
    }

    #[test]
    fn test_empty_port() {
        let mut config = create_valid_config();
        config.radio.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_radio_id_with_delimiter() {
        let mut config = create_valid_config();
        config.radio.id = "OM|1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_partner_id() {
        let mut config = create_valid_config();
        config.radio.partner_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.radio.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &VALID_BAUD_RATES {
            let mut config = create_valid_config();
            config.radio.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_send_interval_zero() {
        let mut config = create_valid_config();
        config.radio.send_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_send_interval_too_high() {
        let mut config = create_valid_config();
        config.radio.send_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_capacity_zero() {
        let mut config = create_valid_config();
        config.radio.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_warn_depth_above_capacity() {
        let mut config = create_valid_config();
        config.radio.queue_warn_depth = 17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_edge_backend() {
        let mut config = create_valid_config();
        config.input.edge_backend = "evdev".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_glitch_filter_too_long() {
        let mut config = create_valid_config();
        config.input.glitch_filter_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_glitch_filter_disabled() {
        let mut config = create_valid_config();
        config.input.glitch_filter_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_button_pins() {
        let mut config = create_valid_config();
        config.input.button_pins = [12, 13, 12, 3];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analog_channel_out_of_bounds() {
        let mut config = create_valid_config();
        config.right_stick.x_channel = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analog_channel_shared_between_sticks() {
        let mut config = create_valid_config();
        config.right_stick.y_channel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_offset() {
        let mut config = create_valid_config();
        config.left_stick.angular_offset_deg = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_bounds_left_to_construction() {
        let mut config = create_valid_config();
        config.left_stick.x_low = 3.0;
        config.left_stick.x_high = 3.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = Config::from_toml_str(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
