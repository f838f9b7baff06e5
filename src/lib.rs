pub mod cli;
pub mod domain;
pub mod error;
pub mod exitcode;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
// In a real production crate, we might use a feature flag "test-utils"
pub mod test_support;

pub use domain::{ComposeRuntime, RegistryCredential, RunSummary, Service, UpdateAction, UpdateResult};
pub use error::SetupError;
pub use infra::DockerAdapter;
pub use services::{CleanupOptions, Orchestrator, RegistryAuthenticator, SystemService};
