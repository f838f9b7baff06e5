use super::{RegistryCredential, Service};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::time::Duration;

/// Local image id of each compose service, `None` when the image is not present
pub type ResolvedImages = BTreeMap<String, Option<String>>;

/// Image ids of each compose service's running containers
pub type RunningImages = BTreeMap<String, BTreeSet<String>>;

/// Trait for the external container/compose tool
pub trait ComposeRuntime: Send + Sync + Debug {
    /// Check that the container tool and its compose plugin can be invoked
    fn is_available(&self) -> bool;

    /// Log in to a registry, persisting the tool's auth state
    fn login(&self, credential: &RegistryCredential) -> Result<()>;

    /// Log out of a registry
    fn logout(&self, registry: &str) -> Result<()>;

    /// Pull the images referenced by a service's compose file. With
    /// `skip_buildable`, images of compose services that declare `build` are left out.
    fn pull(&self, service: &Service, skip_buildable: bool) -> Result<()>;

    /// Build the images declared by a service's compose file
    fn build(&self, service: &Service, no_cache: bool) -> Result<()>;

    /// Image id each compose service of the project resolves to locally
    fn resolved_images(&self, service: &Service) -> Result<ResolvedImages>;

    /// Image ids backing the project's running containers, keyed by compose service
    fn running_images(&self, service: &Service) -> Result<RunningImages>;

    /// Recreate the project's containers, giving them `stop_timeout` to exit
    fn recreate(&self, service: &Service, stop_timeout: Duration) -> Result<()>;

    /// Prune dangling images
    fn prune_images(&self) -> Result<()>;

    /// Prune unused volumes
    fn prune_volumes(&self) -> Result<()>;

    /// Prune build cache
    fn prune_build_cache(&self) -> Result<()>;

    /// Prune unused networks
    fn prune_networks(&self) -> Result<()>;
}
