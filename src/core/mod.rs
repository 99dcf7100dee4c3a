//! Core module - configuration resolution and discovery

pub mod cache;
pub mod discovery;
pub mod error;
pub mod guard;
pub mod merge;
pub mod paths;
pub mod record;
pub mod service;
pub mod store;
pub mod strategy;
pub mod validate;

pub use cache::ProjectCache;
pub use error::{Error, ParseError, PathError, Result, Violation};
pub use guard::{FileSnapshot, MutationState, ProjectLocks, VersionMarker};
pub use merge::ConfigSource;
pub use paths::PathResolver;
pub use record::{
    DiscoveryConfig, DocumentScan, GlobalEntry, LocalProject, ProjectRecord, Strategy,
};
pub use service::{CreateProject, ProjectService, UpdatePatch};
pub use store::ConfigStore;
pub use validate::{ProjectInput, Validator};
