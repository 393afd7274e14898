use std::sync::Arc;

use serde::Serialize;

use crate::{Classify, Config, Convert, Files, NsfwDetector};

/// The handles an [Index] is constructed from, all of them already resolved.
#[derive(Clone)]
pub struct IndexDependencies {
    pub config: Arc<Config>,
    pub classify: Arc<dyn Classify>,
    pub nsfw_detector: Arc<dyn NsfwDetector>,
    pub convert: Arc<dyn Convert>,
    pub files: Arc<dyn Files>,
}

/// What an index run is able to do with the services it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub labels: bool,
    pub nsfw: bool,
    pub write_sidecars: bool,
}

/// Indexes originals, using all other services.
pub trait Index: Send + Sync {
    fn dependencies(&self) -> &IndexDependencies;

    fn capabilities(&self) -> Capabilities {
        let deps = self.dependencies();
        Capabilities {
            labels: !deps.classify.disabled(),
            nsfw: !deps.nsfw_detector.disabled(),
            write_sidecars: !deps.files.read_only(),
        }
    }
}

pub struct Indexer {
    deps: IndexDependencies,
}

impl Indexer {
    pub fn new(deps: IndexDependencies) -> Self {
        Self { deps }
    }
}

impl Index for Indexer {
    fn dependencies(&self) -> &IndexDependencies {
        &self.deps
    }
}
