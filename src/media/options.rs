use serde::{Deserialize, Serialize};

/// Media type used when the host does not ask for one
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// Recorder configuration passed through from the host
///
/// Field names follow the platform recorder's option bag, so a host can send
/// `{"mimeType": "video/webm;codecs=vp8", "videoBitsPerSecond": 2500000}` as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bits_per_second: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bits_per_second: Option<u32>,

    /// Overall bitrate; overrides the per-track values when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits_per_second: Option<u32>,
}

impl RecorderOptions {
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn audio_bits_per_second(mut self, value: u32) -> Self {
        self.audio_bits_per_second = Some(value);
        self
    }

    pub fn video_bits_per_second(mut self, value: u32) -> Self {
        self.video_bits_per_second = Some(value);
        self
    }

    pub fn bits_per_second(mut self, value: u32) -> Self {
        self.bits_per_second = Some(value);
        self
    }

    /// The requested mime type, or the default container
    pub fn effective_mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// A parsed `type/subtype;codecs=a,b` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub essence: String,
    pub codecs: Vec<String>,
}

impl MimeType {
    /// Parse a media type string. Returns `None` for malformed input.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();

        let (kind, subtype) = essence.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut codecs = Vec::new();
        for param in parts {
            let Some((name, raw)) = param.split_once('=') else {
                return None;
            };
            if name.trim().eq_ignore_ascii_case("codecs") {
                codecs = raw
                    .trim()
                    .trim_matches('"')
                    .split(',')
                    .map(|c| c.trim().to_ascii_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect();
            }
        }

        Some(Self { essence, codecs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_serialize_camel_case_and_skip_unset() {
        let options = RecorderOptions::default()
            .mime_type("video/webm")
            .video_bits_per_second(2_500_000);

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mimeType": "video/webm", "videoBitsPerSecond": 2_500_000})
        );
    }

    #[test]
    fn options_deserialize_from_empty_object() {
        let options: RecorderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, RecorderOptions::default());
        assert_eq!(options.effective_mime_type(), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn parse_mime_with_codecs() {
        let mime = MimeType::parse("Video/WebM; codecs=\"vp8, opus\"").unwrap();
        assert_eq!(mime.essence, "video/webm");
        assert_eq!(mime.codecs, vec!["vp8", "opus"]);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(MimeType::parse("webm").is_none());
        assert!(MimeType::parse("video/").is_none());
        assert!(MimeType::parse("video/webm;codecs").is_none());
    }
}
