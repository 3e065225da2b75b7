//! Media analysis jobs: a photo or video plus the memory it belongs to.

use base64::Engine;
use memgarden_core::error::InputError;
use memgarden_core::media::MediaRequest;
use serde::{Deserialize, Serialize};

/// Largest upload accepted, in decoded bytes.
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image", "jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_TYPES: &[&str] = &["video", "mp4", "mov", "avi", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Accepts `image`/`video`, a file extension, or a MIME type.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let name = name.rsplit(['.', '/']).next().unwrap_or_default();
        if IMAGE_TYPES.contains(&name) {
            Some(Self::Image)
        } else if VIDEO_TYPES.contains(&name) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// MIME type for a bare `image`/`video` or extension.
    fn mime_type(self, name: &str) -> String {
        let ext = name.trim().to_lowercase();
        let ext = ext.rsplit('.').next().unwrap_or_default();
        match (self, ext) {
            (Self::Image, "png" | "gif" | "webp") => format!("image/{ext}"),
            (Self::Image, _) => "image/jpeg".into(),
            (Self::Video, "mov") => "video/quicktime".into(),
            (Self::Video, "avi") => "video/x-msvideo".into(),
            (Self::Video, "webm") => "video/webm".into(),
            (Self::Video, _) => "video/mp4".into(),
        }
    }
}

/// A media analysis job as sent by the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaJob {
    /// `image`, `video`, a file extension or a MIME type
    #[serde(default)]
    pub media_type: String,
    /// Base64-encoded media bytes
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub memory_context: Option<String>,
    /// Replaces the memory-garden prompt when set.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl MediaJob {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        serde_json::from_str(raw).map_err(|e| InputError::InvalidRequest(e.to_string()))
    }

    /// A job for raw bytes, typically read from a file.
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Result<MediaKind, InputError> {
        let declared = self.mime_type.as_deref().unwrap_or(&self.media_type);
        MediaKind::parse(&self.media_type)
            .or_else(|| MediaKind::parse(declared))
            .ok_or_else(|| {
                InputError::UnsupportedMedia(format!("Unsupported media type: {}", self.media_type))
            })
    }

    /// Validate the upload and build the analysis request.
    pub fn build(&self) -> Result<MediaRequest, InputError> {
        let kind = self.kind()?;

        if self.data.trim().is_empty() {
            return Err(InputError::MissingField("No media data provided".into()));
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| InputError::InvalidRequest(format!("Media data is not valid base64: {e}")))?;
        if decoded.len() > MAX_MEDIA_BYTES {
            return Err(InputError::UnsupportedMedia(format!(
                "File too large. Please upload files smaller than {}MB",
                MAX_MEDIA_BYTES / (1024 * 1024)
            )));
        }

        let mime_type = self
            .mime_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| kind.mime_type(&self.media_type));
        let prompt = match self.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(prompt) => prompt.to_string(),
            None => memory_prompt(kind, self.memory_context.as_deref()),
        };

        Ok(MediaRequest::new(prompt, mime_type, self.data.trim()))
    }
}

fn memory_prompt(kind: MediaKind, context: Option<&str>) -> String {
    let context = context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("No extra info given");
    format!(
        "As a kind friend, look at this {} for a memory garden (4-5 lines max):\n\n\
         Memory Context: {context}\n\n\
         Use simple words, give a nice short description. IMPORTANT: Always end with a guiding \
         question that starts with 'What' or 'How' to help them explore this memory more.",
        kind.as_str()
    )
}
