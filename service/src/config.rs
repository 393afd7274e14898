use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// Process-wide configuration, read by every other service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the original media files live.
    pub originals_path: PathBuf,
    /// Writable location for caches, sidecar files and thumbnails.
    pub storage_path: PathBuf,
    /// Directory containing the classification and content-safety models.
    pub models_path: PathBuf,
    /// Never write to the originals directory.
    pub read_only: bool,
    /// Disables all model based services (labels and content safety).
    pub disable_tensorflow: bool,
    pub disable_nsfw: bool,
    /// Score at or above which content counts as unsafe.
    pub nsfw_threshold: f32,
    pub ffmpeg_bin: PathBuf,
    pub darktable_bin: PathBuf,
    pub jpeg_quality: u8,
    /// Maximum edge length of converted JPEGs, in pixels.
    pub jpeg_size: u32,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            originals_path: PathBuf::from("/srv/gallery/originals"),
            storage_path: PathBuf::from("/srv/gallery/storage"),
            models_path: PathBuf::from("/srv/gallery/assets/models"),
            read_only: false,
            disable_tensorflow: false,
            disable_nsfw: false,
            nsfw_threshold: 0.75,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            darktable_bin: PathBuf::from("darktable-cli"),
            jpeg_quality: 92,
            jpeg_size: 7680,
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

/// Configuration flags, each also settable through the environment.
/// Unset flags fall back to the config file, then to the defaults.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML file to read the configuration from.
    #[arg(long, env = "GALLERY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[arg(long, env = "GALLERY_ORIGINALS_PATH")]
    pub originals_path: Option<PathBuf>,

    #[arg(long, env = "GALLERY_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    #[arg(long, env = "GALLERY_MODELS_PATH")]
    pub models_path: Option<PathBuf>,

    #[arg(long, env = "GALLERY_READ_ONLY")]
    pub read_only: Option<bool>,

    #[arg(long, env = "GALLERY_DISABLE_TENSORFLOW")]
    pub disable_tensorflow: Option<bool>,

    #[arg(long, env = "GALLERY_DISABLE_NSFW")]
    pub disable_nsfw: Option<bool>,

    #[arg(long, env = "GALLERY_NSFW_THRESHOLD")]
    pub nsfw_threshold: Option<f32>,

    #[arg(long, env = "GALLERY_FFMPEG_BIN")]
    pub ffmpeg_bin: Option<PathBuf>,

    #[arg(long, env = "GALLERY_DARKTABLE_BIN")]
    pub darktable_bin: Option<PathBuf>,

    #[arg(long, env = "GALLERY_JPEG_QUALITY")]
    pub jpeg_quality: Option<u8>,

    #[arg(long, env = "GALLERY_JPEG_SIZE")]
    pub jpeg_size: Option<u32>,

    #[arg(long, env = "GALLERY_WORKERS")]
    pub workers: Option<usize>,
}

impl Config {
    /// Reads a config from a TOML file. Keys missing from the file keep
    /// their default value.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("unable to read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Builds the config from the given flags, layered over the config file
    /// (if one was given) and the defaults, and validates the result.
    pub fn load(args: &ConfigArgs) -> Result<Self, Error> {
        let mut config = match &args.config_file {
            Some(path) => {
                debug!(path = %path.display(), "reading config file");
                Self::from_toml_file(path)?
            }
            None => Self::default(),
        };
        config.apply(args);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, args: &ConfigArgs) {
        fn set<T: Clone>(field: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        set(&mut self.originals_path, &args.originals_path);
        set(&mut self.storage_path, &args.storage_path);
        set(&mut self.models_path, &args.models_path);
        set(&mut self.read_only, &args.read_only);
        set(&mut self.disable_tensorflow, &args.disable_tensorflow);
        set(&mut self.disable_nsfw, &args.disable_nsfw);
        set(&mut self.nsfw_threshold, &args.nsfw_threshold);
        set(&mut self.ffmpeg_bin, &args.ffmpeg_bin);
        set(&mut self.darktable_bin, &args.darktable_bin);
        set(&mut self.jpeg_quality, &args.jpeg_quality);
        set(&mut self.jpeg_size, &args.jpeg_size);
        set(&mut self.workers, &args.workers);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.originals_path.as_os_str().is_empty() {
            return Err(Error::Config("originals path must not be empty".into()));
        }
        if self.storage_path.as_os_str().is_empty() {
            return Err(Error::Config("storage path must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.nsfw_threshold) {
            return Err(Error::Config(format!(
                "nsfw threshold must be between 0 and 1, got {}",
                self.nsfw_threshold
            )));
        }
        if !(25..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg quality must be between 25 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.jpeg_size == 0 {
            return Err(Error::Config("jpeg size must be positive".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("at least one worker is required".into()));
        }
        Ok(())
    }

    pub fn cache_path(&self) -> PathBuf {
        self.storage_path.join("cache")
    }

    pub fn sidecar_path(&self) -> PathBuf {
        self.storage_path.join("sidecar")
    }

    pub fn thumbnails_path(&self) -> PathBuf {
        self.cache_path().join("thumbnails")
    }
}
