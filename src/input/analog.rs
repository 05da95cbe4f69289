//! Linux IIO analog source.
//!
//! Reads ADC counts from `<device>/in_voltage<N>_raw`, the sysfs interface
//! the kernel exposes for industrial I/O ADCs.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::AnalogSource;
use crate::error::{RemoteError, Result};

/// Default IIO device directory
pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

/// Analog source backed by an IIO device directory.
#[derive(Debug, Clone)]
pub struct IioAnalogSource {
    device_dir: PathBuf,
}

impl IioAnalogSource {
    /// Creates a source reading from `device_dir`.
    ///
    /// The directory is not probed here; a missing device surfaces as a
    /// [`RemoteError::SensorReadFailure`] on the first read.
    pub fn new<P: AsRef<Path>>(device_dir: P) -> Self {
        let device_dir = device_dir.as_ref().to_path_buf();
        debug!("IIO analog source at {}", device_dir.display());
        Self { device_dir }
    }

    /// Returns the device directory.
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    fn channel_path(&self, channel: u8) -> PathBuf {
        self.device_dir.join(format!("in_voltage{}_raw", channel))
    }
}

impl AnalogSource for IioAnalogSource {
    fn read_raw(&self, channel: u8) -> Result<f64> {
        let path = self.channel_path(channel);
        let contents = fs::read_to_string(&path).map_err(|e| RemoteError::SensorReadFailure {
            channel,
            reason: format!("{}: {}", path.display(), e),
        })?;

        contents
            .trim()
            .parse::<f64>()
            .map_err(|e| RemoteError::SensorReadFailure {
                channel,
                reason: format!("unparseable reading {:?}: {}", contents.trim(), e),
            })
    }
}
