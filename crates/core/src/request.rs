//! Generation request payloads and the per-request context.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::naming::MAX_SEED;

/// Default video length in seconds.
pub const DEFAULT_VIDEO_DURATION_SECS: u32 = 6;
/// Default video frame rate.
pub const DEFAULT_VIDEO_FPS: u32 = 24;
/// Default (and currently only) video resolution.
pub const DEFAULT_VIDEO_DIMENSION: &str = "1280x720";
/// Default classifier-free guidance scale for images.
pub const DEFAULT_CFG_SCALE: f32 = 8.0;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Explicit per-request context handed to the orchestrator.
///
/// Carries the caller's session and a request id for log correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub session_id: Option<String>,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            session_id,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Sizing and sampling parameters for a synchronous image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageParams {
    #[validate(range(min = 1, max = 5))]
    #[serde(default = "default_image_count")]
    pub number_of_images: u32,
    #[validate(range(min = 256, max = 2048))]
    #[serde(default = "default_image_side")]
    pub width: u32,
    #[validate(range(min = 256, max = 2048))]
    #[serde(default = "default_image_side")]
    pub height: u32,
    #[validate(range(min = 1.1, max = 10.0))]
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f32,
    #[validate(range(max = 2_147_483_646))]
    #[serde(default)]
    pub seed: Option<u32>,
    /// Hex colors for color-guided generation; empty for plain text-to-image.
    #[validate(length(max = 10))]
    #[serde(default)]
    pub color_guide: Vec<String>,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            number_of_images: default_image_count(),
            width: default_image_side(),
            height: default_image_side(),
            cfg_scale: default_cfg_scale(),
            seed: None,
            color_guide: Vec::new(),
        }
    }
}

fn default_image_count() -> u32 {
    1
}

fn default_image_side() -> u32 {
    1024
}

fn default_cfg_scale() -> f32 {
    DEFAULT_CFG_SCALE
}

/// A blocking image generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageGenerationRequest {
    #[validate(length(min = 1, max = 256))]
    pub model_id: String,
    #[validate(length(min = 1, max = 1024))]
    pub prompt: String,
    #[validate(nested)]
    #[serde(default)]
    pub params: ImageParams,
}

impl ImageGenerationRequest {
    pub fn validated(self) -> Result<Self, CoreError> {
        self.validate()?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// Configuration for an asynchronous video job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoParams {
    #[validate(range(min = 1, max = 30))]
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[validate(length(min = 3, max = 16))]
    #[serde(default = "default_dimension")]
    pub dimension: String,
    #[validate(range(max = 2_147_483_646))]
    #[serde(default)]
    pub seed: Option<u32>,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration(),
            fps: default_fps(),
            dimension: default_dimension(),
            seed: None,
        }
    }
}

impl VideoParams {
    /// Seed to submit: the requested one, or a fresh random seed.
    pub fn resolved_seed(&self) -> u32 {
        self.seed
            .filter(|s| *s < MAX_SEED)
            .unwrap_or_else(crate::naming::random_seed)
    }
}

fn default_duration() -> u32 {
    DEFAULT_VIDEO_DURATION_SECS
}

fn default_fps() -> u32 {
    DEFAULT_VIDEO_FPS
}

fn default_dimension() -> String {
    DEFAULT_VIDEO_DIMENSION.to_string()
}

/// An asynchronous video generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VideoGenerationRequest {
    /// Model to submit to; the gateway's configured default when absent.
    #[validate(length(min = 1, max = 256))]
    #[serde(default)]
    pub model_id: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub prompt: String,
    /// Base64 PNG used to condition the video.
    #[serde(default)]
    pub reference_image: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub params: VideoParams,
}

impl VideoGenerationRequest {
    pub fn validated(self) -> Result<Self, CoreError> {
        self.validate()?;
        Ok(self)
    }
}
