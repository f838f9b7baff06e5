mod authenticator;
mod orchestrator;
mod system_service;

pub use authenticator::RegistryAuthenticator;
pub use orchestrator::{CleanupOptions, Decision, Orchestrator, UpdateOptions, decide};
pub use system_service::SystemService;
