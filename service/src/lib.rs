//! Lazily constructed, process-wide service handles.
//!
//! [Services] holds one slot per service. The first call to an accessor
//! constructs the service (and, transitively, its dependencies) exactly once,
//! no matter how many threads ask concurrently; every call returns the same
//! instance. [global] exposes one such registry for the whole process.

mod errors;
mod guard;
mod registry;
mod slot;

pub mod classify;
pub mod config;
pub mod convert;
pub mod factory;
pub mod files;
pub mod global;
pub mod graph;
pub mod index;
pub mod nsfw;

pub use classify::{Classifier, Classify};
pub use config::{Config, ConfigArgs};
pub use convert::{Convert, Converter};
pub use errors::{BuildError, Error};
pub use factory::{DefaultServiceFactory, ServiceFactory};
pub use files::{FileStore, Files};
pub use graph::ServiceName;
pub use guard::{Guard, GuardState, Outcome};
pub use index::{Capabilities, Index, IndexDependencies, Indexer};
pub use nsfw::{NsfwDetector, NsfwFilter};
pub use registry::Services;
pub use slot::ResolveState;

#[cfg(test)]
mod tests;
