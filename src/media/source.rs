use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One unit of captured media as delivered by a capture source
#[derive(Debug, Clone)]
pub struct MediaFrame {
    /// Track this frame belongs to
    pub kind: TrackKind,
    /// Raw payload bytes
    pub data: Vec<u8>,
    /// Milliseconds since the source was acquired
    pub timestamp_ms: u64,
}

/// Which tracks a capture request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    /// Combined camera + microphone capture
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }

    pub fn tracks(&self) -> Vec<TrackKind> {
        let mut tracks = Vec::with_capacity(2);
        if self.audio {
            tracks.push(TrackKind::Audio);
        }
        if self.video {
            tracks.push(TrackKind::Video);
        }
        tracks
    }
}

/// A live audio/video stream handle
///
/// Frames are produced by a platform task until the source is released. The
/// frame receiver can be taken exactly once, by the recorder bound to this source.
pub struct CaptureSource {
    id: Uuid,
    tracks: Vec<TrackKind>,
    frames: Option<mpsc::Receiver<MediaFrame>>,
    producer: Option<JoinHandle<()>>,
    live: Arc<AtomicBool>,
    live_count: Option<Arc<AtomicUsize>>,
}

impl CaptureSource {
    /// Wrap a frame channel and the task feeding it
    pub fn new(
        tracks: Vec<TrackKind>,
        frames: mpsc::Receiver<MediaFrame>,
        producer: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
            frames: Some(frames),
            producer,
            live: Arc::new(AtomicBool::new(true)),
            live_count: None,
        }
    }

    /// Track this source in a platform-wide count of live sources
    pub(crate) fn with_live_count(mut self, count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        self.live_count = Some(count);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[TrackKind] {
        &self.tracks
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Take the frame receiver. Returns `None` if a recorder already owns it.
    pub fn take_frames(&mut self) -> Option<mpsc::Receiver<MediaFrame>> {
        self.frames.take()
    }

    /// Stop all tracks and the producing task
    pub fn release(&mut self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.frames = None;

        if let Some(count) = &self.live_count {
            count.fetch_sub(1, Ordering::SeqCst);
        }

        info!("Capture source {} released", self.id);
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        if self.is_live() {
            debug!("Releasing capture source {} on drop", self.id);
            self.release();
        }
    }
}

impl std::fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSource")
            .field("id", &self.id)
            .field("tracks", &self.tracks)
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_is_idempotent_and_updates_count() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::channel(4);
        let mut source =
            CaptureSource::new(vec![TrackKind::Video], rx, None).with_live_count(count.clone());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(source.is_live());

        source.release();
        source.release();

        assert!(!source.is_live());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(source.take_frames().is_none());
    }

    #[tokio::test]
    async fn drop_releases_source() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::channel(4);
        let source = CaptureSource::new(MediaConstraints::audio_video().tracks(), rx, None)
            .with_live_count(count.clone());

        assert_eq!(source.tracks(), &[TrackKind::Audio, TrackKind::Video]);
        drop(source);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
