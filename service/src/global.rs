//! The process-wide registry.
//!
//! [install] publishes one [Services] for the lifetime of the process; the
//! free functions below forward to it. Code that can carry a [Services]
//! around (and all tests) should prefer doing so.

use std::sync::{Arc, OnceLock};

use crate::{Classify, Config, Convert, Error, Files, Index, NsfwDetector, Services};

static SERVICES: OnceLock<Services> = OnceLock::new();

/// Installs the process-wide registry. Only the first call succeeds, later
/// ones return [Error::AlreadyInstalled] and drop the registry passed in.
pub fn install(services: Services) -> Result<&'static Services, Error> {
    let mut installed = false;
    let current = SERVICES.get_or_init(|| {
        installed = true;
        services
    });

    if installed {
        Ok(current)
    } else {
        Err(Error::AlreadyInstalled)
    }
}

pub fn services() -> Result<&'static Services, Error> {
    SERVICES.get().ok_or(Error::NotInstalled)
}

pub fn config() -> Result<Arc<Config>, Error> {
    services()?.config()
}

pub fn classify() -> Result<Arc<dyn Classify>, Error> {
    services()?.classify()
}

pub fn nsfw_detector() -> Result<Arc<dyn NsfwDetector>, Error> {
    services()?.nsfw_detector()
}

pub fn convert() -> Result<Arc<dyn Convert>, Error> {
    services()?.convert()
}

pub fn files() -> Result<Arc<dyn Files>, Error> {
    services()?.files()
}

pub fn index() -> Result<Arc<dyn Index>, Error> {
    services()?.index()
}
