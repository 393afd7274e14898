use std::io;
use std::path::{Component, Path, PathBuf};

use crate::Config;

/// Access to the originals directory.
pub trait Files: Send + Sync {
    fn originals_path(&self) -> &Path;

    fn read_only(&self) -> bool;

    /// Resolves a name relative to the originals directory. Names that are
    /// absolute or would leave the directory are rejected with
    /// [io::ErrorKind::InvalidInput].
    fn resolve(&self, name: &Path) -> io::Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    originals_path: PathBuf,
    read_only: bool,
}

impl FileStore {
    pub fn new(originals_path: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            originals_path: originals_path.into(),
            read_only,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.originals_path.clone(), config.read_only)
    }
}

impl Files for FileStore {
    fn originals_path(&self) -> &Path {
        &self.originals_path
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn resolve(&self, name: &Path) -> io::Result<PathBuf> {
        let mut resolved = self.originals_path.clone();
        for component in name.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} is outside of the originals", name.display()),
                    ))
                }
            }
        }
        Ok(resolved)
    }
}
