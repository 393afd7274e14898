use std::path::{Path, PathBuf};

use crate::Config;

/// Assigns labels to images using a classification model.
pub trait Classify: Send + Sync {
    /// Directory the model is loaded from.
    fn model_path(&self) -> &Path;

    /// Whether labelling is switched off entirely.
    fn disabled(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct Classifier {
    model_path: PathBuf,
    disabled: bool,
}

impl Classifier {
    pub fn new(model_path: impl Into<PathBuf>, disabled: bool) -> Self {
        Self {
            model_path: model_path.into(),
            disabled,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.models_path.join("nasnet"),
            config.disable_tensorflow,
        )
    }
}

impl Classify for Classifier {
    fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn disabled(&self) -> bool {
        self.disabled
    }
}
