use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::events::{BridgeEvent, BridgeEventKind, EventHub};
use super::stats::{BridgeStatus, SessionStats};
use crate::error::{BridgeError, BridgeResult};
use crate::media::recorder::RunClock;
use crate::media::{
    Artifact, ArtifactStore, CapturePlatform, CaptureSource, ChunkBuffer, MediaChunk,
    MediaConstraints, MediaRecorder, PreviewSurfaces, RecorderEvent, RecorderOptions,
    RecorderState,
};

/// Upper bound on waiting for a disposed session's final events
const DISPOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a session borrows from the bridge that owns it
#[derive(Clone)]
pub struct SessionContext {
    pub platform: Arc<dyn CapturePlatform>,
    pub previews: PreviewSurfaces,
    pub hub: EventHub,
    pub artifacts: ArtifactStore,
    pub timeslice: Duration,
    pub artifact_mime_type: String,
}

#[derive(Default)]
struct RunProgress {
    clock: Option<RunClock>,
    runs_completed: usize,
}

/// One enabled camera: a capture source, the recorder bound to it, and the
/// relay task that turns recorder events into bridge events
pub struct CaptureSession {
    id: Uuid,
    preview_id: String,
    enabled_at: DateTime<Utc>,
    timeslice: Duration,
    source: CaptureSource,
    recorder: Option<Box<dyn MediaRecorder>>,
    buffer: ChunkBuffer,
    progress: Arc<Mutex<RunProgress>>,
    previews: PreviewSurfaces,
    relay: Option<JoinHandle<()>>,
    relay_gate: Option<oneshot::Sender<()>>,
}

impl CaptureSession {
    /// Acquire a source, show it on `preview_id`, and bind a recorder to it
    pub async fn open(
        context: &SessionContext,
        preview_id: &str,
        options: RecorderOptions,
    ) -> BridgeResult<Self> {
        if !context.previews.contains(preview_id) {
            return Err(BridgeError::PreviewNotFound(preview_id.to_string()));
        }

        let id = Uuid::new_v4();
        info!(
            "Opening capture session {} on preview '{}' ({:?})",
            id, preview_id, options
        );

        let mut source = context
            .platform
            .get_user_media(MediaConstraints::audio_video())
            .await?;

        context.previews.attach(preview_id, source.id())?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let recorder = match context
            .platform
            .create_recorder(&mut source, &options, events_tx)
        {
            Ok(recorder) => recorder,
            Err(e) => {
                error!("Failed to create recorder: {}", e);
                context.previews.detach(preview_id, source.id());
                source.release();
                return Err(e);
            }
        };

        let buffer = ChunkBuffer::new();
        let progress = Arc::new(Mutex::new(RunProgress::default()));

        let relay = Relay {
            session_id: id,
            events: events_rx,
            buffer: buffer.clone(),
            progress: Arc::clone(&progress),
            hub: context.hub.clone(),
            artifacts: context.artifacts.clone(),
            artifact_mime_type: context.artifact_mime_type.clone(),
        };

        // held until the owner has published the session and announced Ready
        let (relay_gate, gate) = oneshot::channel();
        let relay = tokio::spawn(relay.run(gate));

        info!(
            "Capture session {} ready ({} recorder)",
            id,
            recorder.mime_type()
        );

        Ok(Self {
            id,
            preview_id: preview_id.to_string(),
            enabled_at: Utc::now(),
            timeslice: context.timeslice,
            source,
            recorder: Some(recorder),
            buffer,
            progress,
            previews: context.previews.clone(),
            relay: Some(relay),
            relay_gate: Some(relay_gate),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Take the sender that lets the relay start forwarding recorder events.
    ///
    /// The owner emits `Ready` first and then fires the gate, so Ready precedes
    /// every relayed event. Dropping the gate also opens it.
    pub(crate) fn take_relay_gate(&mut self) -> Option<oneshot::Sender<()>> {
        self.relay_gate.take()
    }

    /// Announce the session and open its relay
    pub(crate) fn announce_ready(hub: &EventHub, session_id: Uuid, gate: Option<oneshot::Sender<()>>) {
        hub.emit(BridgeEvent {
            session_id,
            kind: BridgeEventKind::Ready,
        });
        if let Some(gate) = gate {
            let _ = gate.send(());
        }
    }

    pub fn preview_id(&self) -> &str {
        &self.preview_id
    }

    pub fn source(&self) -> &CaptureSource {
        &self.source
    }

    fn recorder(&self) -> BridgeResult<&dyn MediaRecorder> {
        self.recorder.as_deref().ok_or(BridgeError::RecorderClosed)
    }

    /// Begin a run with the session's timeslice. The buffer is emptied before
    /// the run's first chunk is appended.
    pub fn start(&self) -> BridgeResult<()> {
        self.recorder()?.start(self.timeslice)
    }

    pub fn pause(&self) -> BridgeResult<()> {
        self.recorder()?.pause()
    }

    pub fn resume(&self) -> BridgeResult<()> {
        self.recorder()?.resume()
    }

    pub fn stop(&self) -> BridgeResult<()> {
        self.recorder()?.stop()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder
            .as_deref()
            .map(|r| r.state())
            .unwrap_or(RecorderState::Inactive)
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus::from_recorder(self.recorder_state())
    }

    pub fn buffered_chunks(&self) -> Vec<MediaChunk> {
        self.buffer.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        let progress = self.progress.lock();
        SessionStats {
            session_id: self.id,
            status: self.status(),
            preview_id: self.preview_id.clone(),
            mime_type: self
                .recorder
                .as_deref()
                .map(|r| r.mime_type().to_string())
                .unwrap_or_default(),
            enabled_at: self.enabled_at,
            chunks_buffered: self.buffer.len(),
            bytes_buffered: self.buffer.size_bytes(),
            recording_duration_ms: progress.clock.as_ref().map_or(0, RunClock::elapsed_ms),
            runs_completed: progress.runs_completed,
        }
    }

    /// Tear the session down: finalize an active run, wait for its events to be
    /// relayed, then release the source and clear the preview
    pub async fn dispose(mut self) {
        info!("Disposing capture session {}", self.id);
        self.relay_gate.take();

        if let Some(recorder) = self.recorder.take() {
            if recorder.state() != RecorderState::Inactive {
                info!("Finalizing active recording of session {}", self.id);
                if let Err(e) = recorder.stop() {
                    warn!("Failed to stop recorder during dispose: {}", e);
                }
            }
            // closes the engine's command channel, which ends the relay
            drop(recorder);
        }

        if let Some(relay) = self.relay.take() {
            let abort = relay.abort_handle();
            match tokio::time::timeout(DISPOSE_TIMEOUT, relay).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Relay task panicked: {}", e),
                Err(_) => {
                    warn!("Relay for session {} did not drain in time", self.id);
                    abort.abort();
                }
            }
        }

        self.previews.detach(&self.preview_id, self.source.id());
        self.source.release();

        info!("Capture session {} disposed", self.id);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.previews.detach(&self.preview_id, self.source.id());
    }
}

/// Sole consumer of a recorder's events and sole writer of the chunk buffer
struct Relay {
    session_id: Uuid,
    events: mpsc::UnboundedReceiver<RecorderEvent>,
    buffer: ChunkBuffer,
    progress: Arc<Mutex<RunProgress>>,
    hub: EventHub,
    artifacts: ArtifactStore,
    artifact_mime_type: String,
}

impl Relay {
    async fn run(mut self, gate: oneshot::Receiver<()>) {
        // a dropped gate means the session is going away; drain anyway
        let _ = gate.await;
        debug!("Relay for session {} started", self.session_id);

        while let Some(event) = self.events.recv().await {
            let kind = self.apply(event);
            self.hub.emit(BridgeEvent {
                session_id: self.session_id,
                kind,
            });
        }

        debug!("Relay for session {} finished", self.session_id);
    }

    fn apply(&self, event: RecorderEvent) -> BridgeEventKind {
        match event {
            RecorderEvent::Start => {
                self.buffer.clear();
                self.progress.lock().clock = Some(RunClock::start());
                BridgeEventKind::Started
            }
            RecorderEvent::DataAvailable(chunk) => {
                let timestamp_ms = chunk.timestamp_ms;
                self.buffer.push(chunk);
                BridgeEventKind::ChunkAvailable { timestamp_ms }
            }
            RecorderEvent::Pause => {
                if let Some(clock) = self.progress.lock().clock.as_mut() {
                    clock.pause();
                }
                BridgeEventKind::Paused
            }
            RecorderEvent::Resume => {
                if let Some(clock) = self.progress.lock().clock.as_mut() {
                    clock.resume();
                }
                BridgeEventKind::Resumed
            }
            RecorderEvent::Stop => {
                {
                    let mut progress = self.progress.lock();
                    progress.clock = None;
                    progress.runs_completed += 1;
                }

                let artifact = Artifact {
                    mime_type: self.artifact_mime_type.clone(),
                    data: self.buffer.concat(),
                    chunk_count: self.buffer.len(),
                    created_at: Utc::now(),
                };
                let size_bytes = artifact.size_bytes();
                let artifact = self.artifacts.insert(artifact);

                BridgeEventKind::Stopped {
                    artifact,
                    size_bytes,
                }
            }
            RecorderEvent::Error { kind, message } => {
                error!(
                    "Recorder error in session {}: {} ({})",
                    self.session_id, message, kind
                );
                BridgeEventKind::Error { kind, message }
            }
        }
    }
}
