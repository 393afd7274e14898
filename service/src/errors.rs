use std::sync::Arc;

use thiserror::Error;

use crate::graph::ServiceName;

/// The error type service constructors return.
pub type BuildError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the service accessors.
///
/// A failed construction is cached in its slot and handed out to every later
/// caller, which is why this type is [Clone].
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("construction of service {service} failed: {source}")]
    Failed {
        service: ServiceName,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("service {service} is unavailable, dependency {dependency} failed: {source}")]
    Dependency {
        service: ServiceName,
        dependency: ServiceName,
        source: Box<Error>,
    },

    #[error("construction of service {0} panicked")]
    Poisoned(ServiceName),

    #[error("service dependencies contain a cycle among {0:?}")]
    Cycle(Vec<ServiceName>),

    #[error("no process-wide service registry installed")]
    NotInstalled,

    #[error("a process-wide service registry is already installed")]
    AlreadyInstalled,
}

impl Error {
    pub(crate) fn failed(service: ServiceName, err: BuildError) -> Self {
        Error::Failed {
            service,
            source: Arc::from(err),
        }
    }

    pub(crate) fn dependency(service: ServiceName, dependency: ServiceName, err: Error) -> Self {
        Error::Dependency {
            service,
            dependency,
            source: Box::new(err),
        }
    }

    /// Follows [Error::Dependency] chains down to the service whose own
    /// construction went wrong.
    pub fn root_service(&self) -> Option<ServiceName> {
        match self {
            Error::Failed { service, .. } | Error::Poisoned(service) => Some(*service),
            Error::Dependency { source, .. } => source.root_service(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Config(value.to_string())
    }
}
