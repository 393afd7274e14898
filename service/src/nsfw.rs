use std::path::{Path, PathBuf};

use crate::Config;

/// Scores images for unsafe content.
pub trait NsfwDetector: Send + Sync {
    fn model_path(&self) -> &Path;

    fn threshold(&self) -> f32;

    fn disabled(&self) -> bool;

    /// Whether a model score counts as unsafe. Always false while the
    /// detector is disabled.
    fn is_nsfw(&self, score: f32) -> bool {
        !self.disabled() && score >= self.threshold()
    }
}

#[derive(Debug, Clone)]
pub struct NsfwFilter {
    model_path: PathBuf,
    threshold: f32,
    disabled: bool,
}

impl NsfwFilter {
    pub fn new(model_path: impl Into<PathBuf>, threshold: f32, disabled: bool) -> Self {
        Self {
            model_path: model_path.into(),
            threshold,
            disabled,
        }
    }

    /// Detection is off if either the models or this detector are disabled.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.models_path.join("nsfw"),
            config.nsfw_threshold,
            config.disable_tensorflow || config.disable_nsfw,
        )
    }
}

impl NsfwDetector for NsfwFilter {
    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn disabled(&self) -> bool {
        self.disabled
    }
}
