use serde::{Deserialize, Serialize};

use crate::Visibility;

/// Deployment environment, selects the root segment every path is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Live,
    Staging,
}

impl Environment {
    /// Environment from a staging flag
    pub fn from_staging(is_staging: bool) -> Self {
        if is_staging {
            Self::Staging
        } else {
            Self::Live
        }
    }

    pub fn is_staging(&self) -> bool {
        matches!(self, Self::Staging)
    }
}

/// Target box for generated thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self {
            width: 230,
            height: 335,
        }
    }
}

/// Configuration for the storage gateway
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Which environment root new paths are resolved under
    pub environment: Environment,

    /// Root segment for the live environment
    pub live_root: String,

    /// Root segment for the staging environment
    pub staging_root: String,

    /// Visibility used when a write does not specify one
    pub default_visibility: Visibility,

    /// Default box for `resize_and_store_uploaded_image`
    pub thumbnail: ThumbnailSize,

    /// JPEG quality for thumbnails (1-100)
    pub jpeg_quality: u8,

    /// Length of generated random file names
    pub token_length: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Live,
            live_root: "live".to_string(),
            staging_root: "staging".to_string(),
            default_visibility: Visibility::Public,
            thumbnail: ThumbnailSize::default(),
            jpeg_quality: 100,
            token_length: 40,
        }
    }
}

impl StorageConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the environment taken from `AWS_STAGING`
    pub fn from_env() -> Self {
        let staging = std::env::var("AWS_STAGING")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self::default().with_environment(Environment::from_staging(staging))
    }

    /// Set the environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Shorthand for the staging environment
    pub fn staging(self) -> Self {
        self.with_environment(Environment::Staging)
    }

    /// Override both root segments
    pub fn with_roots<L: Into<String>, S: Into<String>>(mut self, live: L, staging: S) -> Self {
        self.live_root = live.into();
        self.staging_root = staging.into();
        self
    }

    /// Set default visibility
    pub fn with_default_visibility(mut self, visibility: Visibility) -> Self {
        self.default_visibility = visibility;
        self
    }

    /// Set default thumbnail box
    pub fn with_thumbnail(mut self, size: ThumbnailSize) -> Self {
        self.thumbnail = size;
        self
    }

    /// Set JPEG quality, clamped to 1..=100
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set random file name length
    pub fn with_token_length(mut self, len: usize) -> Self {
        self.token_length = len;
        self
    }

    /// Root segment for the configured environment
    pub fn active_root(&self) -> &str {
        match self.environment {
            Environment::Live => &self.live_root,
            Environment::Staging => &self.staging_root,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
