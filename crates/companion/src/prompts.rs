//! Image jobs and the prompt templates behind them.

use memgarden_core::error::InputError;
use memgarden_core::image::ImageRequest;
use serde::{Deserialize, Serialize};

/// Side length used for category icons.
pub const ICON_SIDE: u32 = 512;

const PHOTO_STYLE: &str = "Style: High-quality, professional photography, realistic, detailed, \
    warm lighting, natural colors, cinematic composition, 8K resolution, photorealistic, sharp \
    focus, beautiful natural lighting.";

const GARDEN_BACKGROUND: &str = "A beautiful, realistic garden background with soft natural \
    lighting, lush green plants, gentle sunlight filtering through leaves, peaceful atmosphere, \
    warm and inviting, high-quality photography, natural colors, detailed textures, cinematic \
    composition.";

/// Non-photographic styles a job may ask for. Anything else renders as
/// `realistic`.
const STYLES: &[(&str, &str)] = &[
    ("artistic", "artistic, painterly, beautiful brushstrokes"),
    ("dreamy", "dreamy, ethereal, soft lighting, magical"),
    ("minimalist", "minimalist, clean, simple, elegant"),
    ("watercolor", "watercolor painting, soft colors, artistic"),
    ("sketch", "pencil sketch, hand-drawn, artistic"),
];

fn style_description(style: &str) -> Option<&'static str> {
    let style = style.trim().to_lowercase();
    STYLES
        .iter()
        .find(|(name, _)| *name == style)
        .map(|(_, description)| *description)
}

/// What kind of picture a job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    MemoryVisualization,
    CategoryIcon,
    GardenBackground,
    AiArtwork,
    Custom,
}

impl ImageKind {
    /// Unknown names are treated as `custom`.
    pub fn parse(name: &str) -> Self {
        match name {
            "memory_visualization" => Self::MemoryVisualization,
            "category_icon" => Self::CategoryIcon,
            "garden_background" => Self::GardenBackground,
            "ai_artwork" => Self::AiArtwork,
            _ => Self::Custom,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MemoryVisualization => "memory_visualization",
            Self::CategoryIcon => "category_icon",
            Self::GardenBackground => "garden_background",
            Self::AiArtwork => "ai_artwork",
            Self::Custom => "custom",
        }
    }
}

/// An image job as sent by the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageJob {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub memory_title: Option<String>,
    #[serde(default)]
    pub memory_description: Option<String>,
    /// Category for icons; a comma-separated list for artwork.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub tags: Option<String>,
}

fn default_style() -> String {
    "realistic".into()
}

fn default_kind() -> String {
    "custom".into()
}

impl ImageJob {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        serde_json::from_str(raw).map_err(|e| InputError::InvalidRequest(e.to_string()))
    }

    pub fn custom(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            style: default_style(),
            kind: default_kind(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> ImageKind {
        ImageKind::parse(&self.kind)
    }

    /// Expand the job into a concrete image request.
    pub fn build(&self) -> Result<ImageRequest, InputError> {
        let title = text(&self.memory_title);
        let description = text(&self.memory_description);

        let request = match self.kind() {
            ImageKind::MemoryVisualization => match style_description(&self.style) {
                Some(look) => ImageRequest::new(format!(
                    "A beautiful {look} image of: {title}. Scene description: {description} \
                     Style: {look}. The image should capture the essence and emotion of this \
                     memory in a way that feels warm, nostalgic, personal and meaningful."
                )),
                None => ImageRequest::new(format!(
                    "A beautiful, realistic photograph of: {title}. Scene description: {description} \
                     {PHOTO_STYLE} The image should capture the essence and emotion of this memory in a \
                     realistic, photographic style that feels personal and meaningful."
                )),
            },
            ImageKind::CategoryIcon => {
                let emotion = self.emotion.as_deref().filter(|e| !e.is_empty()).unwrap_or("neutral");
                ImageRequest::new(format!(
                    "A realistic, detailed icon representing {} with {emotion} mood. Style: Clean, \
                     realistic, professional, high-quality, detailed, warm colors, natural lighting, \
                     minimalist but detailed, 3D rendered style, photorealistic.",
                    text(&self.category)
                ))
                .with_size(ICON_SIDE, ICON_SIDE)
            }
            ImageKind::GardenBackground => ImageRequest::new(GARDEN_BACKGROUND),
            ImageKind::AiArtwork => {
                let categories = self.category.as_deref().filter(|c| !c.is_empty()).unwrap_or("general");
                let mood = self.emotion.as_deref().filter(|e| !e.is_empty()).unwrap_or("peaceful");
                let look = style_description(&self.style).map_or_else(
                    || {
                        "High-quality, realistic, professional photography, detailed, natural \
                         lighting, warm colors, cinematic composition, photorealistic, sharp focus, \
                         beautiful natural lighting"
                            .to_string()
                    },
                    str::to_string,
                );
                ImageRequest::new(format!(
                    "A beautiful, realistic artwork representing: {title} Description: {description} \
                     Categories: {categories} Mood: {mood} Tags: {} Style: {look}, emotionally evocative.",
                    text(&self.tags)
                ))
            }
            ImageKind::Custom => {
                let prompt = self.prompt.as_deref().map(str::trim).unwrap_or_default();
                if prompt.is_empty() {
                    return Err(InputError::MissingField(
                        "Prompt is required for custom image generation".into(),
                    ));
                }
                ImageRequest::new(prompt)
            }
        };

        Ok(request)
    }
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or_default()
}
