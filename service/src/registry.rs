use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::graph::{self, ServiceName};
use crate::index::IndexDependencies;
use crate::slot::{ResolveState, Slot};
use crate::{Classify, Config, Convert, Error, Files, Index, NsfwDetector, ServiceFactory};

/// Holds one lazily constructed instance per service.
///
/// Every accessor constructs its service on first use, through the
/// [ServiceFactory], and hands out the same instance afterwards. Each service
/// has its own guard: concurrent first calls to the same accessor wait for a
/// single construction, first calls to different accessors do not contend.
///
/// Construction failures are not retried. They are stored like a successful
/// result and returned to every later caller, so a misconfigured service
/// fails on first use rather than at startup. Call [Services::warm_up] to
/// surface such failures eagerly.
pub struct Services {
    factory: Box<dyn ServiceFactory>,

    config: Slot<Config>,
    classify: Slot<dyn Classify>,
    nsfw_detector: Slot<dyn NsfwDetector>,
    convert: Slot<dyn Convert>,
    files: Slot<dyn Files>,
    index: Slot<dyn Index>,
}

impl Services {
    /// Creates an empty registry. Fails with [Error::Cycle] if the declared
    /// service dependencies are not acyclic.
    pub fn new(factory: impl ServiceFactory + 'static) -> Result<Self, Error> {
        Self::checked(factory, ServiceName::dependencies)
    }

    fn checked(
        factory: impl ServiceFactory + 'static,
        dependencies: fn(ServiceName) -> &'static [ServiceName],
    ) -> Result<Self, Error> {
        graph::check(dependencies)?;

        Ok(Self {
            factory: Box::new(factory),
            config: Slot::new(ServiceName::Config),
            classify: Slot::new(ServiceName::Classify),
            nsfw_detector: Slot::new(ServiceName::NsfwDetector),
            convert: Slot::new(ServiceName::Convert),
            files: Slot::new(ServiceName::Files),
            index: Slot::new(ServiceName::Index),
        })
    }

    pub fn config(&self) -> Result<Arc<Config>, Error> {
        self.config.get_or_resolve(
            || Ok(()),
            |()| {
                self.factory
                    .config()
                    .map_err(|e| Error::failed(ServiceName::Config, e))
            },
        )
    }

    pub fn classify(&self) -> Result<Arc<dyn Classify>, Error> {
        self.classify.get_or_resolve(
            || self.config_for(ServiceName::Classify),
            |config| {
                self.factory
                    .classify(config)
                    .map_err(|e| Error::failed(ServiceName::Classify, e))
            },
        )
    }

    pub fn nsfw_detector(&self) -> Result<Arc<dyn NsfwDetector>, Error> {
        self.nsfw_detector.get_or_resolve(
            || self.config_for(ServiceName::NsfwDetector),
            |config| {
                self.factory
                    .nsfw_detector(config)
                    .map_err(|e| Error::failed(ServiceName::NsfwDetector, e))
            },
        )
    }

    pub fn convert(&self) -> Result<Arc<dyn Convert>, Error> {
        self.convert.get_or_resolve(
            || self.config_for(ServiceName::Convert),
            |config| {
                self.factory
                    .convert(config)
                    .map_err(|e| Error::failed(ServiceName::Convert, e))
            },
        )
    }

    pub fn files(&self) -> Result<Arc<dyn Files>, Error> {
        self.files.get_or_resolve(
            || self.config_for(ServiceName::Files),
            |config| {
                self.factory
                    .files(config)
                    .map_err(|e| Error::failed(ServiceName::Files, e))
            },
        )
    }

    /// Returns the index, resolving all five of its dependencies first.
    /// They are resolved outside the index's own guard: a dependency that
    /// fails or panics leaves the index reporting that dependency.
    pub fn index(&self) -> Result<Arc<dyn Index>, Error> {
        self.index.get_or_resolve(
            || {
                Ok(IndexDependencies {
                    config: self.config_for(ServiceName::Index)?,
                    classify: require(ServiceName::Index, ServiceName::Classify, self.classify())?,
                    nsfw_detector: require(
                        ServiceName::Index,
                        ServiceName::NsfwDetector,
                        self.nsfw_detector(),
                    )?,
                    convert: require(ServiceName::Index, ServiceName::Convert, self.convert())?,
                    files: require(ServiceName::Index, ServiceName::Files, self.files())?,
                })
            },
            |deps| {
                self.factory
                    .index(deps)
                    .map_err(|e| Error::failed(ServiceName::Index, e))
            },
        )
    }

    fn config_for(&self, service: ServiceName) -> Result<Arc<Config>, Error> {
        require(service, ServiceName::Config, self.config())
    }

    /// Resolves every service, dependencies first, and returns the first
    /// failure.
    #[instrument(skip(self), err)]
    pub fn warm_up(&self) -> Result<(), Error> {
        for name in graph::resolution_order()? {
            self.resolve(name)?;
        }
        Ok(())
    }

    /// Resolves a service by name, discarding the handle.
    pub fn resolve(&self, name: ServiceName) -> Result<(), Error> {
        match name {
            ServiceName::Config => self.config().map(drop),
            ServiceName::Classify => self.classify().map(drop),
            ServiceName::NsfwDetector => self.nsfw_detector().map(drop),
            ServiceName::Convert => self.convert().map(drop),
            ServiceName::Files => self.files().map(drop),
            ServiceName::Index => self.index().map(drop),
        }
    }

    /// Returns where a service is in its lifecycle, without triggering its
    /// construction.
    pub fn state(&self, name: ServiceName) -> ResolveState {
        match name {
            ServiceName::Config => self.config.state(),
            ServiceName::Classify => self.classify.state(),
            ServiceName::NsfwDetector => self.nsfw_detector.state(),
            ServiceName::Convert => self.convert.state(),
            ServiceName::Files => self.files.state(),
            ServiceName::Index => self.index.state(),
        }
    }

    pub fn states(&self) -> BTreeMap<ServiceName, ResolveState> {
        ServiceName::ALL
            .into_iter()
            .map(|name| (name, self.state(name)))
            .collect()
    }

    /// Returns the config if it was resolved successfully already.
    pub fn resolved_config(&self) -> Option<Arc<Config>> {
        self.config.get()
    }

    /// Returns the index if it was resolved successfully already.
    pub fn resolved_index(&self) -> Option<Arc<dyn Index>> {
        self.index.get()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("states", &self.states())
            .finish_non_exhaustive()
    }
}

fn require<T>(
    service: ServiceName,
    dependency: ServiceName,
    res: Result<T, Error>,
) -> Result<T, Error> {
    res.map_err(|e| Error::dependency(service, dependency, e))
}
