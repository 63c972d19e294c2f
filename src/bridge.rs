//! Host-facing entry points
//!
//! `CaptureBridge` holds at most one `CaptureSession`. Enabling the camera
//! again disposes the previous session before a new source is acquired.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::media::{
    Artifact, ArtifactStore, CapturePlatform, MediaChunk, PreviewSurfaces, RecorderOptions,
};
use crate::session::{
    BridgeListener, BridgeStatus, CaptureSession, EventHub, ListenerId, SessionContext,
    SessionStats, Subscription,
};

pub struct CaptureBridge {
    context: SessionContext,
    session: Mutex<Option<CaptureSession>>,
    /// Serializes enable/disable so sessions are replaced one at a time
    lifecycle: tokio::sync::Mutex<()>,
}

impl CaptureBridge {
    pub fn new(platform: Arc<dyn CapturePlatform>, config: &Config) -> Self {
        let previews = PreviewSurfaces::with_surfaces(config.capture.preview_surfaces.iter().cloned());

        info!(
            "Capture bridge created on {} platform (timeslice {}ms, artifacts as {})",
            platform.name(),
            config.recorder.timeslice_ms,
            config.recorder.artifact_mime_type
        );

        Self {
            context: SessionContext {
                platform,
                previews,
                hub: EventHub::new(),
                artifacts: ArtifactStore::new(),
                timeslice: config.recorder.timeslice(),
                artifact_mime_type: config.recorder.artifact_mime_type.clone(),
            },
            session: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn previews(&self) -> &PreviewSurfaces {
        &self.context.previews
    }

    pub fn platform(&self) -> &Arc<dyn CapturePlatform> {
        &self.context.platform
    }

    /// Acquire camera + microphone, show them on `preview_id`, and prepare a
    /// recorder configured by `options`. Any previous session is disposed first.
    pub async fn enable_camera(
        &self,
        preview_id: &str,
        options: RecorderOptions,
    ) -> BridgeResult<Uuid> {
        let _lifecycle = self.lifecycle.lock().await;

        let prior = self.session.lock().take();
        if let Some(prior) = prior {
            info!("Replacing capture session {}", prior.id());
            prior.dispose().await;
        }

        let mut session = CaptureSession::open(&self.context, preview_id, options).await?;
        let id = session.id();
        let gate = session.take_relay_gate();
        *self.session.lock() = Some(session);

        // controls reach the session from here on, including from Ready handlers
        CaptureSession::announce_ready(&self.context.hub, id, gate);

        Ok(id)
    }

    /// Dispose the current session, if any. Returns whether one existed.
    pub async fn disable_camera(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;

        let session = self.session.lock().take();
        match session {
            Some(session) => {
                session.dispose().await;
                true
            }
            None => false,
        }
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&CaptureSession) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let session = self.session.lock();
        match session.as_ref() {
            Some(session) => f(session),
            None => {
                warn!("Recording control called before the camera was enabled");
                Err(BridgeError::NotEnabled)
            }
        }
    }

    /// Clear the chunk buffer and start recording, one chunk per timeslice
    pub fn start_recording(&self) -> BridgeResult<()> {
        self.with_session(|session| session.start())
    }

    pub fn pause_recording(&self) -> BridgeResult<()> {
        self.with_session(|session| session.pause())
    }

    pub fn resume_recording(&self) -> BridgeResult<()> {
        self.with_session(|session| session.resume())
    }

    /// Ask the recorder to stop. The artifact arrives later in a `Stopped` event.
    pub fn stop_recording(&self) -> BridgeResult<()> {
        self.with_session(|session| session.stop())
    }

    pub fn status(&self) -> BridgeStatus {
        self.session
            .lock()
            .as_ref()
            .map_or(BridgeStatus::Inactive, CaptureSession::status)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.lock().as_ref().map(CaptureSession::id)
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.session.lock().as_ref().map(CaptureSession::stats)
    }

    /// Chunks of the current (or most recent) run, in emission order
    pub fn buffered_chunks(&self) -> BridgeResult<Vec<MediaChunk>> {
        self.with_session(|session| Ok(session.buffered_chunks()))
    }

    pub fn is_type_supported(&self, mime_type: &str) -> bool {
        self.context.platform.is_type_supported(mime_type)
    }

    pub fn subscribe(&self) -> Subscription {
        self.context.hub.subscribe()
    }

    pub fn add_listener(&self, listener: Arc<dyn BridgeListener>) -> ListenerId {
        self.context.hub.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.context.hub.remove_listener(id)
    }

    /// Open subscriptions plus registered listeners
    pub fn observer_count(&self) -> usize {
        self.context.hub.observer_count()
    }

    pub fn resolve_artifact(&self, reference: &str) -> BridgeResult<Arc<Artifact>> {
        self.context
            .artifacts
            .resolve(reference)
            .ok_or_else(|| BridgeError::ArtifactNotFound(reference.to_string()))
    }

    pub fn revoke_artifact(&self, reference: &str) -> BridgeResult<()> {
        if self.context.artifacts.revoke(reference) {
            Ok(())
        } else {
            Err(BridgeError::ArtifactNotFound(reference.to_string()))
        }
    }

    /// Dispose the session, drop every artifact, and end event streams
    pub async fn shutdown(&self) {
        info!("Shutting down capture bridge");
        self.disable_camera().await;
        self.context.artifacts.clear();
        self.context.hub.close();
    }
}
