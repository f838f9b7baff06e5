pub mod config;
pub mod credentials;
pub mod docker_adapter;
pub mod service_discovery;

pub use docker_adapter::DockerAdapter;
pub use service_discovery::{ServiceDiscovery, ServiceFilter};
