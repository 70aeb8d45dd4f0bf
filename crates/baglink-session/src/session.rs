use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use baglink_frame::{encode_command, Command, FrameError, LineReader};
use baglink_telemetry::{Classifier, TelemetrySnapshot};
use baglink_transport::{EndpointDescriptor, LinkStream, TransportError};

use crate::collaborators::{EventSink, LocationSource};
use crate::error::{Result, SessionError};
use crate::event::{DisconnectReason, SessionEvent};
use crate::handshake::{BagId, Handshake, HandshakeOutcome};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Listening,
    Disconnecting,
    Failed,
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound of the event delivery channel. A full queue applies
    /// backpressure to the read loop rather than dropping or reordering.
    pub event_queue_depth: usize,
    /// Size of each blocking read from the link.
    pub read_chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_queue_depth: 256,
            read_chunk_size: 1024,
        }
    }
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub connect_attempts: u64,
    pub connects_succeeded: u64,
    pub frames_decoded: u64,
    pub frames_rejected: u64,
}

/// State shared between the session handle and its read loop.
struct Shared {
    state: Mutex<SessionState>,
    stop: AtomicBool,
    bag_id: Mutex<Option<BagId>>,
    snapshot: Mutex<Option<TelemetrySnapshot>>,
    stats: Mutex<SessionStats>,
}

/// Poisoning is ignored; the guarded values are plain data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One connection session to the bag.
///
/// Wraps one [`LinkStream`], owns the authentication state, the codec carry
/// buffer and the classifier, and publishes a single ordered event stream.
/// A reconnect is a logically new session: `connect` resets every piece of
/// per-connection state even when it reuses the same endpoint.
///
/// Reconnection policy lives with the caller; the session never retries on
/// its own.
pub struct BagSession {
    config: SessionConfig,
    shared: Arc<Shared>,
    writer: Arc<Mutex<Option<LinkStream>>>,
    pending_reader: Option<LinkStream>,
    loop_handle: Option<JoinHandle<()>>,
    location: Option<Arc<dyn LocationSource>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl Default for BagSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl BagSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                stop: AtomicBool::new(false),
                bag_id: Mutex::new(None),
                snapshot: Mutex::new(None),
                stats: Mutex::new(SessionStats::default()),
            }),
            writer: Arc::new(Mutex::new(None)),
            pending_reader: None,
            loop_handle: None,
            location: None,
            sink: None,
        }
    }

    /// Attach a persistent log sink for alert and lifecycle messages.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a position source; its fixes are stamped onto sink records.
    pub fn with_location_source(mut self, location: Arc<dyn LocationSource>) -> Self {
        self.location = Some(location);
        self
    }

    /// Open the link to the endpoint chosen by the caller.
    ///
    /// Allowed from `Idle` and `Failed`. Starts a logically new session:
    /// authentication, the carry buffer and the last snapshot are all fresh.
    pub fn connect(&mut self, endpoint: &EndpointDescriptor) -> Result<()> {
        {
            let mut state = lock(&self.shared.state);
            match *state {
                SessionState::Idle | SessionState::Failed => *state = SessionState::Connecting,
                _ => return Err(SessionError::AlreadyConnected),
            }
        }
        // A previous failed loop has already exited; reap it.
        if let Some(handle) = self.loop_handle.take() {
            let _ = handle.join();
        }
        lock(&self.shared.stats).connect_attempts += 1;

        let stream = match LinkStream::connect(endpoint) {
            Ok(stream) => stream,
            Err(err) => {
                *lock(&self.shared.state) = SessionState::Failed;
                return Err(err.into());
            }
        };
        let write_half = match stream.try_clone() {
            Ok(write_half) => write_half,
            Err(err) => {
                *lock(&self.shared.state) = SessionState::Failed;
                return Err(err.into());
            }
        };

        *lock(&self.writer) = Some(write_half);
        self.pending_reader = Some(stream);
        *lock(&self.shared.bag_id) = None;
        *lock(&self.shared.snapshot) = None;
        self.shared.stop.store(false, Ordering::SeqCst);
        lock(&self.shared.stats).connects_succeeded += 1;
        *lock(&self.shared.state) = SessionState::Connected;

        info!(%endpoint, "link connected");
        Ok(())
    }

    /// Start the read loop and return the event stream.
    ///
    /// At most one loop runs per session: a second call while already
    /// listening is a no-op returning `None`, so events are never delivered
    /// twice.
    pub fn listen(&mut self) -> Result<Option<Receiver<SessionEvent>>> {
        {
            let mut state = lock(&self.shared.state);
            match *state {
                SessionState::Listening => {
                    debug!("listen requested while already listening; ignoring");
                    return Ok(None);
                }
                SessionState::Connected => {}
                _ => return Err(SessionError::NotConnected),
            }
            *state = SessionState::Listening;
        }

        let reader = match self.pending_reader.take() {
            Some(reader) => reader,
            None => {
                *lock(&self.shared.state) = SessionState::Failed;
                return Err(SessionError::NotConnected);
            }
        };

        let (tx, rx) = sync_channel(self.config.event_queue_depth);
        let read_loop = ReadLoop {
            reader: LineReader::with_chunk_size(reader, self.config.read_chunk_size),
            tx,
            shared: Arc::clone(&self.shared),
            writer: Arc::clone(&self.writer),
            sink: self.sink.clone(),
            location: self.location.clone(),
            handshake: Handshake::new(),
            classifier: Classifier::new(),
        };
        self.loop_handle = Some(std::thread::spawn(move || read_loop.run()));

        Ok(Some(rx))
    }

    /// Transmit one actuator command. Accepted only while listening.
    pub fn send_command(&self, command: Command) -> Result<()> {
        if self.state() != SessionState::Listening {
            return Err(SessionError::NotConnected);
        }
        let mut writer = lock(&self.writer);
        let stream = writer.as_mut().ok_or(SessionError::NotConnected)?;
        stream
            .write_all(&encode_command(command))
            .and_then(|()| stream.flush())
            .map_err(|err| SessionError::Transport(TransportError::Io(err)))?;
        debug!(%command, "command sent");
        Ok(())
    }

    /// Stop the session from any state.
    ///
    /// Stops event delivery (even for already-buffered frames), releases the
    /// link, joins the read loop and resets authentication. After return a
    /// restart observes a fully reset session; two read loops never coexist.
    pub fn disconnect(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        *lock(&self.shared.state) = SessionState::Disconnecting;

        // Shutting the socket down wakes a reader blocked on it.
        if let Some(writer) = lock(&self.writer).take() {
            let _ = writer.shutdown();
        }
        if let Some(reader) = self.pending_reader.take() {
            let _ = reader.shutdown();
        }
        if let Some(handle) = self.loop_handle.take() {
            let _ = handle.join();
        }

        *lock(&self.shared.bag_id) = None;
        *lock(&self.shared.snapshot) = None;
        *lock(&self.shared.state) = SessionState::Idle;
        info!("session stopped");
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.shared.state)
    }

    /// The authenticated bag identity, if any (torn-read free).
    pub fn current_bag_id(&self) -> Option<BagId> {
        lock(&self.shared.bag_id).clone()
    }

    /// The most recent validated snapshot, if any.
    pub fn current_snapshot(&self) -> Option<TelemetrySnapshot> {
        *lock(&self.shared.snapshot)
    }

    pub fn stats(&self) -> SessionStats {
        *lock(&self.shared.stats)
    }
}

impl Drop for BagSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Everything the background read loop owns exclusively.
struct ReadLoop {
    reader: LineReader<LinkStream>,
    tx: SyncSender<SessionEvent>,
    shared: Arc<Shared>,
    writer: Arc<Mutex<Option<LinkStream>>>,
    sink: Option<Arc<dyn EventSink>>,
    location: Option<Arc<dyn LocationSource>>,
    handshake: Handshake,
    classifier: Classifier,
}

impl ReadLoop {
    fn run(mut self) {
        debug!("read loop started");

        let reason = loop {
            if self.stopped() {
                break None;
            }
            match self.reader.read_line() {
                Ok(line) => {
                    if self.stopped() {
                        break None;
                    }
                    if let Err(reason) = self.handle_frame(&line) {
                        break Some(reason);
                    }
                }
                Err(FrameError::ConnectionClosed) => {
                    if self.stopped() {
                        break None;
                    }
                    break Some(DisconnectReason::RemoteClosed);
                }
                Err(FrameError::Io(err)) => {
                    if self.stopped() {
                        break None;
                    }
                    break Some(DisconnectReason::Io(err.to_string()));
                }
            }
        };

        self.handshake.reset();
        self.classifier.reset();
        *lock(&self.shared.bag_id) = None;
        *lock(&self.shared.snapshot) = None;

        if let Some(reason) = reason {
            warn!(%reason, "link lost");
            *lock(&self.shared.state) = SessionState::Failed;
            self.record(&format!("bag link disconnected: {reason}"));
            self.emit(SessionEvent::Disconnected { reason });
        }
        debug!("read loop exited");
    }

    fn stopped(&self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }

    /// Deliver an event, honoring the stop flag and queue backpressure.
    fn emit(&self, event: SessionEvent) {
        let mut event = event;
        loop {
            if self.stopped() {
                return;
            }
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    event = back;
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Consumer dropped the stream; treat as a stop request.
                    self.shared.stop.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    /// Fire-and-forget log record with the current position attached.
    fn record(&self, message: &str) {
        if let Some(sink) = &self.sink {
            let fix = self.location.as_ref().and_then(|l| l.current_fix());
            sink.record(message, fix);
        }
    }

    /// Route one decoded frame. `Err` means the link itself failed.
    fn handle_frame(&mut self, line: &[u8]) -> std::result::Result<(), DisconnectReason> {
        lock(&self.shared.stats).frames_decoded += 1;

        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(_) => {
                lock(&self.shared.stats).frames_rejected += 1;
                self.emit(SessionEvent::FrameRejected {
                    reason: "frame is not valid UTF-8".to_string(),
                });
                return Ok(());
            }
        };

        if Handshake::matches(text) {
            let outcome = {
                let mut writer = lock(&self.writer);
                match writer.as_mut() {
                    Some(stream) => self.handshake.process(text, stream),
                    // Session is tearing down; the stop flag ends the loop.
                    None => return Ok(()),
                }
            };
            match outcome {
                Ok(HandshakeOutcome::Accepted(bag_id)) => {
                    *lock(&self.shared.bag_id) = Some(bag_id.clone());
                    self.record(&format!("bag {bag_id} authenticated"));
                    self.emit(SessionEvent::Authenticated { bag_id });
                }
                Ok(HandshakeOutcome::Rejected { reason }) => {
                    self.record(&format!("bag identity rejected: {reason}"));
                    self.emit(SessionEvent::AuthRejected { reason });
                }
                Err(err) => return Err(DisconnectReason::Io(err.to_string())),
            }
            return Ok(());
        }

        match baglink_telemetry::parse(text) {
            Ok(snapshot) => {
                *lock(&self.shared.snapshot) = Some(snapshot);
                self.emit(SessionEvent::Telemetry { snapshot });
                for alert in self.classifier.observe(snapshot) {
                    self.record(&alert.message());
                    self.emit(SessionEvent::Alert { alert });
                }
            }
            Err(err) => {
                lock(&self.shared.stats).frames_rejected += 1;
                debug!(%err, frame = text, "dropping malformed frame");
                self.emit(SessionEvent::FrameRejected {
                    reason: err.to_string(),
                });
            }
        }
        Ok(())
    }
}
