use std::io;
use std::path::{Component, Path, PathBuf};

use crate::Config;

/// Converts originals (raw images, videos) into JPEG sidecar files.
pub trait Convert: Send + Sync {
    fn ffmpeg_bin(&self) -> &Path;
    fn darktable_bin(&self) -> &Path;
    fn jpeg_quality(&self) -> u8;
    fn jpeg_size(&self) -> u32;

    /// Where the JPEG rendition of an original, given relative to the
    /// originals directory, is written. Names that are empty, absolute or
    /// would leave the sidecar directory are rejected with
    /// [io::ErrorKind::InvalidInput].
    fn sidecar_jpeg(&self, original: &Path) -> io::Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct Converter {
    ffmpeg_bin: PathBuf,
    darktable_bin: PathBuf,
    sidecar_path: PathBuf,
    jpeg_quality: u8,
    jpeg_size: u32,
}

impl Converter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            darktable_bin: config.darktable_bin.clone(),
            sidecar_path: config.sidecar_path(),
            jpeg_quality: config.jpeg_quality,
            jpeg_size: config.jpeg_size,
        }
    }
}

impl Convert for Converter {
    fn ffmpeg_bin(&self) -> &Path {
        &self.ffmpeg_bin
    }

    fn darktable_bin(&self) -> &Path {
        &self.darktable_bin
    }

    fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    fn jpeg_size(&self) -> u32 {
        self.jpeg_size
    }

    fn sidecar_jpeg(&self, original: &Path) -> io::Result<PathBuf> {
        let invalid = || {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a name below the originals", original.display()),
            )
        };

        let mut relative = PathBuf::new();
        for component in original.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                _ => return Err(invalid()),
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(invalid());
        }

        // keep the original extension, "IMG_1.CR2" becomes "IMG_1.CR2.jpg"
        let mut sidecar = self.sidecar_path.join(relative).into_os_string();
        sidecar.push(".jpg");
        Ok(PathBuf::from(sidecar))
    }
}
