use std::sync::Arc;

use crate::errors::BuildError;
use crate::index::IndexDependencies;
use crate::{
    Classifier, Classify, Config, ConfigArgs, Convert, Converter, FileStore, Files, Index,
    Indexer, NsfwDetector, NsfwFilter,
};

/// Constructs the individual services.
///
/// Each method receives only the services it depends on, already resolved,
/// and is called at most once per [crate::Services]. Implementations never
/// get access to the registry itself, so they cannot reach for a service
/// outside their declared dependencies.
pub trait ServiceFactory: Send + Sync {
    fn config(&self) -> Result<Arc<Config>, BuildError>;

    fn classify(&self, config: Arc<Config>) -> Result<Arc<dyn Classify>, BuildError>;

    fn nsfw_detector(&self, config: Arc<Config>) -> Result<Arc<dyn NsfwDetector>, BuildError>;

    fn convert(&self, config: Arc<Config>) -> Result<Arc<dyn Convert>, BuildError>;

    fn files(&self, config: Arc<Config>) -> Result<Arc<dyn Files>, BuildError>;

    fn index(&self, deps: IndexDependencies) -> Result<Arc<dyn Index>, BuildError>;
}

enum ConfigSource {
    Args(ConfigArgs),
    Fixed(Config),
}

/// Builds the bundled service implementations.
pub struct DefaultServiceFactory {
    source: ConfigSource,
}

impl DefaultServiceFactory {
    /// Loads the config from flags, environment and config file when it is
    /// first needed.
    pub fn from_args(args: ConfigArgs) -> Self {
        Self {
            source: ConfigSource::Args(args),
        }
    }

    /// Uses an already assembled config. It is still validated on first use.
    pub fn with_config(config: Config) -> Self {
        Self {
            source: ConfigSource::Fixed(config),
        }
    }
}

impl ServiceFactory for DefaultServiceFactory {
    fn config(&self) -> Result<Arc<Config>, BuildError> {
        let config = match &self.source {
            ConfigSource::Args(args) => Config::load(args)?,
            ConfigSource::Fixed(config) => {
                config.validate()?;
                config.clone()
            }
        };
        Ok(Arc::new(config))
    }

    fn classify(&self, config: Arc<Config>) -> Result<Arc<dyn Classify>, BuildError> {
        Ok(Arc::new(Classifier::from_config(&config)))
    }

    fn nsfw_detector(&self, config: Arc<Config>) -> Result<Arc<dyn NsfwDetector>, BuildError> {
        Ok(Arc::new(NsfwFilter::from_config(&config)))
    }

    fn convert(&self, config: Arc<Config>) -> Result<Arc<dyn Convert>, BuildError> {
        Ok(Arc::new(Converter::from_config(&config)))
    }

    fn files(&self, config: Arc<Config>) -> Result<Arc<dyn Files>, BuildError> {
        Ok(Arc::new(FileStore::from_config(&config)))
    }

    fn index(&self, deps: IndexDependencies) -> Result<Arc<dyn Index>, BuildError> {
        Ok(Arc::new(Indexer::new(deps)))
    }
}
