use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable prefix, e.g. `CAPTURE_BRIDGE__SERVICE__HTTP__PORT=9000`
pub const ENV_PREFIX: &str = "CAPTURE_BRIDGE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recorder: RecorderConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Chunk cadence requested when recording starts
    pub timeslice_ms: u64,
    /// Media type tagged on every assembled artifact
    pub artifact_mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Preview surfaces known at startup
    pub preview_surfaces: Vec<String>,
    pub video_frame_interval_ms: u64,
    pub video_frame_bytes: usize,
    pub audio_frame_interval_ms: u64,
    pub audio_frame_bytes: usize,
    /// Frames buffered between a source and its recorder before dropping
    pub frame_queue_depth: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "capture-bridge".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 1000,
            artifact_mime_type: crate::media::DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

impl RecorderConfig {
    /// Chunk cadence; zero records each run as a single chunk delivered on stop
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preview_surfaces: vec!["preview".to_string()],
            video_frame_interval_ms: 40, // 25 fps
            video_frame_bytes: 1024,
            audio_frame_interval_ms: 20,
            audio_frame_bytes: 320,
            frame_queue_depth: 256,
        }
    }
}

impl Config {
    /// Load from a file (extension optional) layered under environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    /// Like `load`, but falls back to defaults (plus environment) when no file exists
    pub fn load_or_default(path: &str) -> Result<Self> {
        let candidates = [
            path.to_string(),
            format!("{path}.toml"),
            format!("{path}.yaml"),
            format!("{path}.json"),
        ];
        if candidates.iter().any(|c| Path::new(c).exists()) {
            return Self::load(path);
        }

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_browser_recorder_behavior() {
        let config = Config::default();
        assert_eq!(config.recorder.timeslice(), Duration::from_secs(1));
        assert_eq!(config.recorder.artifact_mime_type, "video/webm");
        assert_eq!(config.capture.preview_surfaces, vec!["preview"]);
        assert_eq!(config.service.http.port, 8787);
    }

    #[test]
    fn partial_file_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bridge.toml");
        fs::write(
            &path,
            "[recorder]\ntimeslice_ms = 250\n\n[capture]\npreview_surfaces = [\"left\", \"right\"]\n",
        )?;

        let config = Config::load(path.to_str().unwrap())?;

        assert_eq!(config.recorder.timeslice_ms, 250);
        assert_eq!(config.recorder.artifact_mime_type, "video/webm");
        assert_eq!(config.capture.preview_surfaces, vec!["left", "right"]);
        assert_eq!(config.capture.video_frame_interval_ms, 40);
        assert_eq!(config.service.name, "capture-bridge");
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("absent");

        let config = Config::load_or_default(path.to_str().unwrap())?;

        assert_eq!(config.recorder.timeslice_ms, 1000);
        Ok(())
    }

    #[test]
    fn zero_timeslice_is_not_clamped() {
        let recorder = RecorderConfig {
            timeslice_ms: 0,
            ..RecorderConfig::default()
        };
        assert!(recorder.timeslice().is_zero());
    }
}
