use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::chunk::MediaChunk;
use super::options::RecorderOptions;
use super::source::MediaFrame;
use crate::error::{BridgeError, BridgeResult};

/// Default chunk cadence requested by `start_recording`
pub const DEFAULT_TIMESLICE: Duration = Duration::from_secs(1);

/// Recorder state machine: inactive → recording ⇄ paused → inactive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Inactive => "inactive",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events a recorder emits, in the order it emits them
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    Start,
    DataAvailable(MediaChunk),
    Pause,
    Resume,
    Stop,
    Error { kind: String, message: String },
}

/// Recording engine bound to one capture source
///
/// Control calls only dispatch; their effects arrive later as `RecorderEvent`s
/// on the channel handed to the engine at construction.
pub trait MediaRecorder: Send + Sync {
    /// Begin a run, emitting a chunk every `timeslice`. Restarts a run in progress.
    /// A zero timeslice records the whole run into one chunk delivered on stop.
    fn start(&self, timeslice: Duration) -> BridgeResult<()>;

    fn pause(&self) -> BridgeResult<()>;

    fn resume(&self) -> BridgeResult<()>;

    /// Flush pending data and end the run. No-op when inactive.
    fn stop(&self) -> BridgeResult<()>;

    fn state(&self) -> RecorderState;

    /// Container type of the produced chunks
    fn mime_type(&self) -> &str;
}

/// State shared between the handle and its engine task
#[derive(Debug, Clone, Copy)]
struct Shared {
    state: RecorderState,
    source_ended: bool,
}

enum Command {
    Start(Duration),
    Pause,
    Resume,
    Stop,
}

/// Reference engine: packages source frames into one chunk per timeslice
pub struct TimesliceRecorder {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<RwLock<Shared>>,
    mime_type: String,
}

impl TimesliceRecorder {
    /// Spawn the engine task. It exits once this handle is dropped.
    pub fn spawn(
        frames: mpsc::Receiver<MediaFrame>,
        options: &RecorderOptions,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(RwLock::new(Shared {
            state: RecorderState::Inactive,
            source_ended: false,
        }));
        let mime_type = options.effective_mime_type().to_string();

        let engine = Engine {
            frames,
            commands: command_rx,
            events,
            shared: Arc::clone(&shared),
        };
        tokio::spawn(engine.run());

        debug!("Recorder engine spawned ({})", mime_type);

        Self {
            commands,
            shared,
            mime_type,
        }
    }

    fn send(&self, command: Command) -> BridgeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::RecorderClosed)
    }
}

impl MediaRecorder for TimesliceRecorder {
    fn start(&self, timeslice: Duration) -> BridgeResult<()> {
        let mut shared = self.shared.write();
        if shared.source_ended {
            warn!("Recorder start rejected: capture source has ended");
            return Err(BridgeError::InvalidState {
                operation: "start",
                state: shared.state,
            });
        }
        if shared.state != RecorderState::Inactive {
            warn!("Recorder restarted while {}; discarding current run", shared.state);
        }
        self.send(Command::Start(timeslice))?;
        shared.state = RecorderState::Recording;
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        let mut shared = self.shared.write();
        match shared.state {
            RecorderState::Inactive => Err(BridgeError::InvalidState {
                operation: "pause",
                state: shared.state,
            }),
            RecorderState::Paused => Ok(()),
            RecorderState::Recording => {
                self.send(Command::Pause)?;
                shared.state = RecorderState::Paused;
                Ok(())
            }
        }
    }

    fn resume(&self) -> BridgeResult<()> {
        let mut shared = self.shared.write();
        match shared.state {
            RecorderState::Inactive => Err(BridgeError::InvalidState {
                operation: "resume",
                state: shared.state,
            }),
            RecorderState::Recording => Ok(()),
            RecorderState::Paused => {
                self.send(Command::Resume)?;
                shared.state = RecorderState::Recording;
                Ok(())
            }
        }
    }

    fn stop(&self) -> BridgeResult<()> {
        let mut shared = self.shared.write();
        if shared.state == RecorderState::Inactive {
            return Ok(());
        }
        self.send(Command::Stop)?;
        shared.state = RecorderState::Inactive;
        Ok(())
    }

    fn state(&self) -> RecorderState {
        self.shared.read().state
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Media time of one run, excluding paused intervals
pub(crate) struct RunClock {
    started: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl RunClock {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    pub(crate) fn pause(&mut self) {
        self.paused_at.get_or_insert_with(Instant::now);
    }

    pub(crate) fn resume(&mut self) {
        if let Some(at) = self.paused_at.take() {
            self.paused_total += at.elapsed();
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        let now = self.paused_at.unwrap_or_else(Instant::now);
        let elapsed = now.duration_since(self.started).saturating_sub(self.paused_total);
        elapsed.as_millis() as u64
    }
}

struct Engine {
    frames: mpsc::Receiver<MediaFrame>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<RecorderEvent>,
    shared: Arc<RwLock<Shared>>,
}

impl Engine {
    async fn run(mut self) {
        let mut recording = false;
        let mut paused = false;
        let mut ticking = false;
        let mut source_open = true;
        let mut pending: Vec<u8> = Vec::new();
        let mut slice_start_ms = 0;
        let mut clock = RunClock::start();
        let mut ticker = time::interval(DEFAULT_TIMESLICE);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    match command {
                        Command::Start(_) if !source_open => {
                            // source ended after the handle accepted the start
                            self.shared.write().state = RecorderState::Inactive;
                            self.emit(source_ended_error());
                        }
                        Command::Start(timeslice) => {
                            pending.clear();
                            recording = true;
                            paused = false;
                            slice_start_ms = 0;
                            clock = RunClock::start();
                            ticking = !timeslice.is_zero();
                            if ticking {
                                ticker = time::interval_at(Instant::now() + timeslice, timeslice);
                                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                                info!("Recording started (timeslice {}ms)", timeslice.as_millis());
                            } else {
                                info!("Recording started (single chunk on stop)");
                            }
                            self.emit(RecorderEvent::Start);
                        }
                        Command::Pause => {
                            if recording && !paused {
                                paused = true;
                                clock.pause();
                                info!("Recording paused at {}ms", clock.elapsed_ms());
                                self.emit(RecorderEvent::Pause);
                            }
                        }
                        Command::Resume => {
                            if recording && paused {
                                paused = false;
                                clock.resume();
                                ticker.reset();
                                info!("Recording resumed at {}ms", clock.elapsed_ms());
                                self.emit(RecorderEvent::Resume);
                            }
                        }
                        Command::Stop => {
                            if recording {
                                recording = false;
                                self.flush(&mut pending, &mut slice_start_ms, &clock);
                                info!("Recording stopped at {}ms", clock.elapsed_ms());
                                self.emit(RecorderEvent::Stop);
                            }
                        }
                    }
                }

                frame = self.frames.recv(), if source_open => {
                    match frame {
                        Some(frame) => {
                            if recording && !paused {
                                pending.extend_from_slice(&frame.data);
                            }
                        }
                        None => {
                            source_open = false;
                            {
                                let mut shared = self.shared.write();
                                shared.source_ended = true;
                                shared.state = RecorderState::Inactive;
                            }
                            if recording {
                                warn!("Capture source ended while recording");
                                recording = false;
                                self.emit(source_ended_error());
                                self.flush(&mut pending, &mut slice_start_ms, &clock);
                                self.emit(RecorderEvent::Stop);
                            } else {
                                debug!("Capture source ended while idle");
                            }
                        }
                    }
                }

                _ = ticker.tick(), if recording && !paused && ticking => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut slice_start_ms, &clock);
                    }
                }
            }
        }

        debug!("Recorder engine exited");
    }

    fn flush(&self, pending: &mut Vec<u8>, slice_start_ms: &mut u64, clock: &RunClock) {
        let chunk = MediaChunk {
            data: std::mem::take(pending),
            timestamp_ms: *slice_start_ms,
        };
        *slice_start_ms = clock.elapsed_ms();
        debug!(
            "Chunk ready: {} bytes at {}ms",
            chunk.len(),
            chunk.timestamp_ms
        );
        self.emit(RecorderEvent::DataAvailable(chunk));
    }

    fn emit(&self, event: RecorderEvent) {
        if self.events.send(event).is_err() {
            debug!("Recorder event dropped: no listener");
        }
    }
}

fn source_ended_error() -> RecorderEvent {
    RecorderEvent::Error {
        kind: "SourceEnded".to_string(),
        message: "capture source ended while recording".to_string(),
    }
}
