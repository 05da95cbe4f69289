//! # Serial Radio Link
//!
//! Drives a transparent serial radio modem (115200 baud, 8N1).
//!
//! Outbound commands go through a bounded queue. When the queue is full the
//! oldest command is dropped, so the receiver always gets the freshest stick
//! positions. A writer task drains the queue one line per send interval; a
//! reader task splits inbound data into lines and hands each one to the
//! data-received handler.

use bytes::{BufMut, BytesMut};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{DataReceivedHandler, RadioLink, RadioSettings};
use crate::error::{RemoteError, Result};
use crate::protocol::wire::{ident_frame, LINE_TERMINATOR, MAX_FRAME_LEN};
use crate::protocol::{Command, RadioFrame};

/// Default radio modem baud rate
pub const RADIO_BAUD_RATE: u32 = 115_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Inactive,
    Active,
    Disposed,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared between the link handle and its tasks.
struct Shared {
    queue: Mutex<VecDeque<String>>,
    capacity: usize,
    notify: Notify,
    handler: Mutex<Option<DataReceivedHandler>>,
    dropped: AtomicU64,
}

impl Shared {
    fn push(&self, frame: String) {
        let mut queue = lock(&self.queue);
        queue.push_back(frame);
        while queue.len() > self.capacity {
            queue.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Radio queue full, dropped oldest frame ({} total)", dropped);
        }
        drop(queue);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<String> {
        lock(&self.queue).pop_front()
    }

    fn deliver(&self, frame: RadioFrame) {
        let handler = lock(&self.handler).clone();
        match handler {
            Some(handler) => handler(frame),
            None => trace!("No handler for received frame: {}", frame),
        }
    }
}

/// Serial radio link over any async byte stream.
pub struct SerialRadio<T> {
    settings: RadioSettings,
    port_name: String,
    state: Mutex<LinkState>,
    io: Mutex<Option<T>>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> std::fmt::Debug for SerialRadio<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialRadio")
            .field("port_name", &self.port_name)
            .field("id", &self.settings.id)
            .field("partner_id", &self.settings.partner_id)
            .finish_non_exhaustive()
    }
}

impl SerialRadio<tokio_serial::SerialStream> {
    /// Opens the radio modem on a serial port.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyS0")
    /// * `baud_rate` - Port speed, normally [`RADIO_BAUD_RATE`]
    /// * `settings` - Session identity and cadence
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Serial`] if the port cannot be opened.
    pub fn open(path: &str, baud_rate: u32, settings: RadioSettings) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RemoteError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened radio modem at {} ({} baud)", path, baud_rate);
        Ok(Self::new(port, path, settings))
    }
}

impl<T> SerialRadio<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps an already opened byte stream. Nothing is transmitted until
    /// [`RadioLink::activate`] is called.
    pub fn new(io: T, port_name: &str, settings: RadioSettings) -> Self {
        let capacity = settings.queue_capacity.max(1);
        Self {
            settings,
            port_name: port_name.to_string(),
            state: Mutex::new(LinkState::Inactive),
            io: Mutex::new(Some(io)),
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                notify: Notify::new(),
                handler: Mutex::new(None),
                dropped: AtomicU64::new(0),
            }),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the port the link was opened on.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the session settings.
    pub fn settings(&self) -> &RadioSettings {
        &self.settings
    }

    /// Number of commands discarded because the queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Waits for the writer and reader tasks to finish after disposal.
    pub async fn closed(&self) {
        let handles = std::mem::take(&mut *lock(&self.tasks));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Radio task ended abnormally: {}", e);
            }
        }
    }
}

impl<T> RadioLink for SerialRadio<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    fn activate(&self, announce: bool) -> Result<()> {
        let mut state = lock(&self.state);
        if *state != LinkState::Inactive {
            return Err(RemoteError::InvalidState(format!(
                "radio link cannot be activated while {:?}",
                *state
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RemoteError::InvalidState(format!("no async runtime: {}", e)))?;
        let io = lock(&self.io)
            .take()
            .ok_or_else(|| RemoteError::InvalidState("radio port already taken".to_string()))?;

        if announce {
            let frame = ident_frame(&self.settings.id, &self.settings.partner_id);
            lock(&self.shared.queue).push_front(frame);
        }

        let (reader, writer) = tokio::io::split(io);
        let mut tasks = lock(&self.tasks);
        tasks.push(runtime.spawn(write_loop(
            writer,
            Arc::clone(&self.shared),
            self.cancel.clone(),
            self.settings.send_interval,
        )));
        tasks.push(runtime.spawn(read_loop(
            reader,
            Arc::clone(&self.shared),
            self.cancel.clone(),
        )));

        *state = LinkState::Active;
        info!(
            "Radio {} -> {} active on {} (every {} ms)",
            self.settings.id,
            self.settings.partner_id,
            self.port_name,
            self.settings.send_interval.as_millis()
        );
        Ok(())
    }

    fn send(&self, command: &Command) -> Result<()> {
        let state = *lock(&self.state);
        if state != LinkState::Active {
            return Err(RemoteError::RadioUnavailable(format!("link is {:?}", state)));
        }
        self.shared.push(command.as_str().to_string());
        Ok(())
    }

    fn queue_depth(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    fn send_interval(&self) -> Duration {
        self.settings.send_interval
    }

    fn on_data_received(&self, handler: DataReceivedHandler) {
        *lock(&self.shared.handler) = Some(handler);
    }

    fn dispose(&self) {
        {
            let mut state = lock(&self.state);
            if *state == LinkState::Disposed {
                return;
            }
            *state = LinkState::Disposed;
        }

        self.cancel.cancel();
        let pending = {
            let mut queue = lock(&self.shared.queue);
            let pending = queue.len();
            queue.clear();
            pending
        };
        lock(&self.io).take();
        info!(
            "Radio {} disposed ({} pending frames discarded)",
            self.settings.id, pending
        );
    }
}

impl<T> Drop for SerialRadio<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Writes one line per send interval until cancelled.
///
/// Cancellation is only observed between frames, so a frame is never cut off.
async fn write_loop<W>(
    mut writer: W,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    interval: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let mut line = BytesMut::with_capacity(MAX_FRAME_LEN);

    loop {
        let frame = match shared.pop() {
            Some(frame) => frame,
            None => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = shared.notify.notified() => {}
                }
                continue;
            }
        };

        line.clear();
        line.put_slice(frame.as_bytes());
        line.put_u8(LINE_TERMINATOR);

        match write_line(&mut writer, &line).await {
            Ok(()) => trace!("Transmitted {}", frame),
            Err(e) => warn!("Radio write failed: {}", e),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Radio writer shutdown: {}", e);
    }
    debug!("Radio writer stopped");
}

async fn write_line<W>(writer: &mut W, line: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line)
        .await
        .map_err(|e| RemoteError::Serial(format!("Failed to write frame: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| RemoteError::Serial(format!("Failed to flush radio port: {}", e)))?;
    Ok(())
}

/// Splits inbound bytes into lines and delivers each non-empty one.
async fn read_loop<R>(mut reader: R, shared: Arc<Shared>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(MAX_FRAME_LEN);

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = reader.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("Radio port closed by peer");
                break;
            }
            Ok(_) => {
                while let Some(pos) = buf.iter().position(|&b| b == LINE_TERMINATOR) {
                    let line = buf.split_to(pos + 1);
                    let body = &line[..pos];
                    if body.is_empty() || body == b"\r" {
                        continue;
                    }
                    shared.deliver(RadioFrame::parse(body));
                }
                if buf.len() > MAX_FRAME_LEN {
                    warn!("Discarding {} bytes without line terminator", buf.len());
                    buf.clear();
                }
            }
            Err(e) => {
                warn!("Radio read failed: {}", e);
                break;
            }
        }
    }

    debug!("Radio reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::SampledVector;
    use crate::protocol::encode;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};
    use tokio::sync::mpsc;

    fn settings(capacity: usize) -> RadioSettings {
        RadioSettings {
            id: "OM1".to_string(),
            partner_id: "OC1".to_string(),
            send_interval: Duration::from_millis(200),
            queue_capacity: capacity,
        }
    }

    fn command(magnitude: f64) -> Command {
        let right = SampledVector {
            magnitude,
            angle_radians: 0.5,
            ..SampledVector::ZERO
        };
        encode(&SampledVector::ZERO, &right).unwrap()
    }

    fn radio(capacity: usize) -> (SerialRadio<DuplexStream>, DuplexStream) {
        let (local, peer) = tokio::io::duplex(1024);
        (SerialRadio::new(local, "duplex", settings(capacity)), peer)
    }

    async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[test]
    fn test_constants() {
        assert_eq!(RADIO_BAUD_RATE, 115_200);
    }

    #[test]
    fn test_open_with_invalid_path_returns_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();

        let result = SerialRadio::open("/dev/nonexistent_radio_12345", RADIO_BAUD_RATE, settings(8));
        match result {
            Err(RemoteError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_radio_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_before_activate_is_unavailable() {
        let (radio, _peer) = radio(8);
        assert!(matches!(
            radio.send(&command(10.0)),
            Err(RemoteError::RadioUnavailable(_))
        ));
        assert_eq!(radio.queue_depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transmits_commands_as_lines() {
        let (radio, peer) = radio(8);
        let mut peer = BufReader::new(peer);
        radio.activate(false).unwrap();

        radio.send(&command(42.7)).unwrap();
        radio.send(&command(10.0)).unwrap();

        assert_eq!(read_line(&mut peer).await, "D|0.5|42|0\n");
        assert_eq!(read_line(&mut peer).await, "D|0.5|10|0\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_paces_frames_at_send_interval() {
        let (radio, peer) = radio(8);
        let mut peer = BufReader::new(peer);
        radio.activate(false).unwrap();

        radio.send(&command(1.0)).unwrap();
        radio.send(&command(2.0)).unwrap();

        let start = tokio::time::Instant::now();
        read_line(&mut peer).await;
        read_line(&mut peer).await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_announce_sends_ident_first() {
        let (radio, peer) = radio(8);
        let mut peer = BufReader::new(peer);
        radio.activate(true).unwrap();
        radio.send(&command(5.0)).unwrap();

        assert_eq!(read_line(&mut peer).await, "I|OM1|OC1\n");
        assert_eq!(read_line(&mut peer).await, "D|0.5|5|0\n");
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let (radio, _peer) = radio(4);
        radio.activate(false).unwrap();

        // Current-thread runtime: the writer cannot run until we yield
        for i in 0..10 {
            radio.send(&command(i as f64)).unwrap();
        }

        assert_eq!(radio.queue_depth(), 4);
        assert_eq!(radio.dropped_frames(), 6);
        assert_eq!(radio.shared.pop().unwrap(), "D|0.5|6|0");
    }

    #[tokio::test]
    async fn test_activate_twice_is_invalid() {
        let (radio, _peer) = radio(8);
        radio.activate(false).unwrap();
        assert!(matches!(radio.activate(false), Err(RemoteError::InvalidState(_))));
    }

    #[test]
    fn test_activate_without_runtime_is_invalid() {
        let (local, _peer) = tokio::io::duplex(64);
        let radio = SerialRadio::new(local, "duplex", settings(8));
        assert!(matches!(radio.activate(false), Err(RemoteError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let (radio, _peer) = radio(8);
        radio.activate(false).unwrap();
        radio.send(&command(1.0)).unwrap();

        radio.dispose();
        radio.dispose();

        assert_eq!(radio.queue_depth(), 0);
        assert!(matches!(
            radio.send(&command(1.0)),
            Err(RemoteError::RadioUnavailable(_))
        ));
        assert!(matches!(radio.activate(false), Err(RemoteError::InvalidState(_))));
        radio.closed().await;
    }

    #[tokio::test]
    async fn test_dispose_before_activate() {
        let (radio, _peer) = radio(8);
        radio.dispose();
        assert!(radio.activate(false).is_err());
        radio.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_received_lines_reach_handler() {
        let (radio, mut peer) = radio(8);
        let (tx, mut rx) = mpsc::unbounded_channel();
        radio.on_data_received(Arc::new(move |frame| {
            let _ = tx.send(frame);
        }));
        radio.activate(false).unwrap();

        peer.write_all(b"T|12.6|OK\r\n\nACK\n").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().fields(), ["T", "12.6", "OK"]);
        assert_eq!(rx.recv().await.unwrap().tag(), "ACK");
    }

    #[tokio::test]
    async fn test_debug_output() {
        let (radio, _peer) = radio(8);
        let debug = format!("{:?}", radio);
        assert!(debug.contains("duplex"));
        assert!(debug.contains("OM1"));
        assert_eq!(radio.port_name(), "duplex");
        assert_eq!(radio.settings().partner_id, "OC1");
        assert_eq!(radio.send_interval(), Duration::from_millis(200));
    }

    // Integration test - only runs if a radio modem is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_open_with_real_hardware() {
        match SerialRadio::open("/dev/ttyUSB0", RADIO_BAUD_RATE, settings(8)) {
            Ok(radio) => {
                radio.activate(true).unwrap();
                radio.send(&command(0.0)).unwrap();
                radio.dispose();
                radio.closed().await;
            }
            Err(_) => println!("No radio modem detected (this is OK for CI/CD)"),
        }
    }
}
