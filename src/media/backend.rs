use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::options::{MimeType, RecorderOptions};
use super::recorder::{MediaRecorder, RecorderEvent, TimesliceRecorder};
use super::source::{CaptureSource, MediaConstraints, MediaFrame, TrackKind};
use crate::config::CaptureConfig;
use crate::error::{BridgeError, BridgeResult};

/// Capture + recording facility of the hosting platform
///
/// Implementations:
/// - `SyntheticPlatform`: test-pattern source on tokio timers (headless hosts, tests)
#[async_trait::async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Request a live source. Suspends while permission/devices are arbitrated.
    async fn get_user_media(&self, constraints: MediaConstraints) -> BridgeResult<CaptureSource>;

    /// Construct a recorder that owns the source's frames and reports on `events`
    fn create_recorder(
        &self,
        source: &mut CaptureSource,
        options: &RecorderOptions,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> BridgeResult<Box<dyn MediaRecorder>> {
        let mime_type = options.effective_mime_type();
        if !self.is_type_supported(mime_type) {
            return Err(BridgeError::UnsupportedMimeType(mime_type.to_string()));
        }

        let frames = source.take_frames().ok_or(BridgeError::SourceInUse)?;

        Ok(Box::new(TimesliceRecorder::spawn(frames, options, events)))
    }

    /// Whether recorders on this platform can produce `mime_type`
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Platform name for logging
    fn name(&self) -> &str;
}

/// Outcome of a permission prompt on the synthetic platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    NoDevice,
}

/// Built-in platform producing a test pattern at the configured frame rates
pub struct SyntheticPlatform {
    config: CaptureConfig,
    permission: RwLock<PermissionState>,
    live_sources: Arc<AtomicUsize>,
}

impl SyntheticPlatform {
    const CONTAINERS: [&'static str; 2] = ["video/webm", "audio/webm"];
    const CODECS: [&'static str; 3] = ["vp8", "vp9", "opus"];

    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            permission: RwLock::new(PermissionState::Granted),
            live_sources: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Decide how the next `get_user_media` prompt resolves
    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.write() = permission;
    }

    pub fn permission(&self) -> PermissionState {
        *self.permission.read()
    }

    /// Sources acquired and not yet released
    pub fn live_sources(&self) -> usize {
        self.live_sources.load(Ordering::SeqCst)
    }

    async fn produce(config: CaptureConfig, tracks: Vec<TrackKind>, tx: mpsc::Sender<MediaFrame>) {
        let origin = Instant::now();
        let mut video = time::interval(Duration::from_millis(config.video_frame_interval_ms.max(1)));
        let mut audio = time::interval(Duration::from_millis(config.audio_frame_interval_ms.max(1)));
        video.set_missed_tick_behavior(MissedTickBehavior::Skip);
        audio.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let has_video = tracks.contains(&TrackKind::Video);
        let has_audio = tracks.contains(&TrackKind::Audio);
        let mut sequence: u8 = 0;

        loop {
            let kind = tokio::select! {
                _ = video.tick(), if has_video => TrackKind::Video,
                _ = audio.tick(), if has_audio => TrackKind::Audio,
                else => break,
            };

            let size = match kind {
                TrackKind::Video => config.video_frame_bytes,
                TrackKind::Audio => config.audio_frame_bytes,
            };
            sequence = sequence.wrapping_add(1);

            let frame = MediaFrame {
                kind,
                data: vec![sequence; size],
                timestamp_ms: origin.elapsed().as_millis() as u64,
            };

            match tx.try_send(frame) {
                Ok(()) => {}
                // live capture: frames nobody reads in time are dropped
                Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }

        debug!("Synthetic producer exited");
    }
}

#[async_trait::async_trait]
impl CapturePlatform for SyntheticPlatform {
    async fn get_user_media(&self, constraints: MediaConstraints) -> BridgeResult<CaptureSource> {
        match self.permission() {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                warn!("Capture permission denied");
                return Err(BridgeError::PermissionDenied);
            }
            PermissionState::NoDevice => {
                warn!("No capture device available");
                return Err(BridgeError::NoDevice);
            }
        }

        let tracks = constraints.tracks();
        if tracks.is_empty() {
            return Err(BridgeError::NoDevice);
        }

        let (tx, rx) = mpsc::channel(self.config.frame_queue_depth.max(1));
        let producer = tokio::spawn(Self::produce(self.config.clone(), tracks.clone(), tx));
        let source = CaptureSource::new(tracks, rx, Some(producer))
            .with_live_count(Arc::clone(&self.live_sources));

        info!(
            "Capture source {} acquired ({:?}) on {}",
            source.id(),
            source.tracks(),
            self.name()
        );

        Ok(source)
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        let Some(mime) = MimeType::parse(mime_type) else {
            return false;
        };
        Self::CONTAINERS.contains(&mime.essence.as_str())
            && mime
                .codecs
                .iter()
                .all(|codec| Self::CODECS.contains(&codec.as_str()))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> SyntheticPlatform {
        SyntheticPlatform::new(CaptureConfig::default())
    }

    #[test]
    fn supported_types() {
        let platform = platform();
        assert!(platform.is_type_supported("video/webm"));
        assert!(platform.is_type_supported("video/webm;codecs=vp8,opus"));
        assert!(platform.is_type_supported("audio/webm; codecs=opus"));
        assert!(!platform.is_type_supported("video/mp4"));
        assert!(!platform.is_type_supported("video/webm;codecs=h264"));
        assert!(!platform.is_type_supported("nonsense"));
    }

    #[tokio::test]
    async fn denied_permission_acquires_nothing() {
        let platform = platform();
        platform.set_permission(PermissionState::Denied);

        let result = platform.get_user_media(MediaConstraints::audio_video()).await;
        assert!(matches!(result, Err(BridgeError::PermissionDenied)));
        assert_eq!(platform.live_sources(), 0);

        platform.set_permission(PermissionState::NoDevice);
        let result = platform.get_user_media(MediaConstraints::audio_video()).await;
        assert!(matches!(result, Err(BridgeError::NoDevice)));
    }

    #[tokio::test(start_paused = true)]
    async fn source_produces_both_tracks() {
        let platform = platform();
        let mut source = platform
            .get_user_media(MediaConstraints::audio_video())
            .await
            .unwrap();
        assert_eq!(platform.live_sources(), 1);

        let mut frames = source.take_frames().unwrap();
        let mut seen_audio = false;
        let mut seen_video = false;
        while !(seen_audio && seen_video) {
            match frames.recv().await.unwrap().kind {
                TrackKind::Audio => seen_audio = true,
                TrackKind::Video => seen_video = true,
            }
        }

        source.release();
        assert_eq!(platform.live_sources(), 0);
    }

    #[tokio::test]
    async fn create_recorder_rejects_unsupported_type() {
        let platform = platform();
        let mut source = platform
            .get_user_media(MediaConstraints::audio_video())
            .await
            .unwrap();
        let (events, _rx) = mpsc::unbounded_channel();

        let options = RecorderOptions::default().mime_type("video/mp4");
        let result = platform.create_recorder(&mut source, &options, events);
        assert!(matches!(result, Err(BridgeError::UnsupportedMimeType(m)) if m == "video/mp4"));
    }
}
