mod outcome;
mod registry;
mod service;
pub mod traits;

pub use outcome::{RecreateReason, RunSummary, StepError, UpdateAction, UpdateResult, UpdateStep};
pub use registry::RegistryCredential;
pub use service::{ComposeDocument, Service, normalize_name, scan_for_build_key};
pub use traits::{ComposeRuntime, ResolvedImages, RunningImages};
