//! # Omnimote
//!
//! Handheld remote: samples both joysticks and transmits a drive command to
//! the paired receiver over a serial radio modem.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (`OMNIMOTE_CONFIG`, then `config/default.toml`,
//!      then built-in defaults)
//!    - Set up logging with tracing subscriber
//!    - Open the radio modem, the stick ADC and the button edge source
//!
//! 2. **Main Loop**
//!    - The remote transmits one command per send interval
//!    - Ctrl+C requests shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Dispose the remote (radio first), wait for its tasks and the radio
//!      writer to finish

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use omnimote::config::Config;
use omnimote::input::analog::IioAnalogSource;
use omnimote::input::edge::SoftwareEdgeSource;
use omnimote::radio::SerialRadio;
use omnimote::remote::Remote;
use omnimote::transmit::TokioPacer;

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "OMNIMOTE_CONFIG";

/// Configuration file used when `OMNIMOTE_CONFIG` is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

fn load_config() -> Result<Config> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Config::load(&path).with_context(|| format!("Failed to load config from {}", path));
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_PATH));
    }
    Ok(Config::default())
}

/// Installs the tracing subscriber. The returned guard flushes the log file
/// and must live until exit.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level {}", config.logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if config.logging.directory.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.logging.directory, "omnimote.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config)?;

    info!("Omnimote v{} starting...", env!("CARGO_PKG_VERSION"));

    let radio = Arc::new(
        SerialRadio::open(&config.radio.port, config.radio.baud_rate, config.radio.settings())
            .context("Radio modem unavailable")?,
    );
    let analog = Arc::new(IioAnalogSource::new(&config.input.analog_device));
    info!("Reading sticks from {}", analog.device_dir().display());

    let glitch_filter = config.input.glitch_filter();
    let remote = match config.input.edge_backend.as_str() {
        #[cfg(feature = "gpio")]
        "gpio" => {
            let mut edges = omnimote::input::gpio::GpioEdgeSource::open(glitch_filter)?;
            Remote::new(&config, analog, &mut edges, Arc::clone(&radio), TokioPacer)?
        }
        backend => {
            if backend != "software" {
                warn!("Edge backend {} not compiled in; buttons are inactive", backend);
            }
            let mut edges = SoftwareEdgeSource::new(glitch_filter);
            Remote::new(&config, analog, &mut edges, Arc::clone(&radio), TokioPacer)?
        }
    };

    remote.activate()?;
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down...");

    remote.dispose();
    remote.join().await;
    radio.closed().await;

    let stats = remote.stats();
    info!(
        "Sent {} commands ({} skipped, {} send failures)",
        stats.sent, stats.skipped, stats.send_failures
    );
    Ok(())
}
