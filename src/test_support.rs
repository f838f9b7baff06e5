use crate::domain::{ComposeRuntime, RegistryCredential, ResolvedImages, RunningImages, Service};
use anyhow::{Result, bail};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

/// In-memory stand-in for docker/compose.
///
/// Every call is recorded as `operation:target[:detail]`. Failures are
/// injected with [`MockRuntime::set_fail_on`], either for an operation
/// (`"pull"`) or for one target (`"pull:sonarr"`). Unless configured
/// otherwise, a project has one compose service named after its directory.
#[derive(Debug)]
pub struct MockRuntime {
    /// Local image ids each project resolves to after pull/build
    resolved: RwLock<HashMap<String, ResolvedImages>>,
    /// Image ids of each project's running containers
    running: RwLock<HashMap<String, RunningImages>>,
    /// `project/compose service` pairs whose containers exit after `up`
    one_shot: RwLock<HashSet<String>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<HashSet<String>>,
    logins: RwLock<Vec<RegistryCredential>>,
    available: RwLock<bool>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            resolved: RwLock::new(HashMap::new()),
            running: RwLock::new(HashMap::new()),
            one_shot: RwLock::new(HashSet::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(HashSet::new()),
            logins: RwLock::new(Vec::new()),
            available: RwLock::new(true),
        }
    }

    /// Makes the next pull/build of `service` resolve to `image_id`
    pub fn publish_image(&self, service: &str, image_id: &str) {
        self.publish_images(service, &[(service, Some(image_id))]);
    }

    /// Sets the image of each compose service in `service`; `None` means
    /// the image is missing locally
    pub fn publish_images(&self, service: &str, images: &[(&str, Option<&str>)]) {
        let images = images
            .iter()
            .map(|(name, id)| (name.to_string(), id.map(str::to_string)))
            .collect();
        self.resolved
            .write()
            .unwrap()
            .insert(service.to_string(), images);
    }

    /// Pretends a container of `service` is running from `image_id`
    pub fn set_running(&self, service: &str, image_id: &str) {
        self.set_running_images(service, &[(service, image_id)]);
    }

    /// Pretends one container per `(compose service, image id)` pair is running
    pub fn set_running_images(&self, service: &str, containers: &[(&str, &str)]) {
        let mut images = RunningImages::new();
        for (name, id) in containers {
            images
                .entry(name.to_string())
                .or_insert_with(BTreeSet::new)
                .insert(id.to_string());
        }
        self.running
            .write()
            .unwrap()
            .insert(service.to_string(), images);
    }

    /// Compose service of `service` whose container exits once started
    pub fn mark_one_shot(&self, service: &str, compose_service: &str) {
        self.one_shot
            .write()
            .unwrap()
            .insert(format!("{service}/{compose_service}"));
    }

    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on.write().unwrap().insert(operation.to_string());
    }

    pub fn set_unavailable(&self) {
        *self.available.write().unwrap() = false;
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn logins(&self) -> Vec<RegistryCredential> {
        self.logins.read().unwrap().clone()
    }

    pub fn running_images_of(&self, service: &str) -> RunningImages {
        self.running
            .read()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    fn resolved_images_of(&self, service: &str) -> ResolvedImages {
        self.resolved
            .read()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_else(|| {
                ResolvedImages::from([(service.to_string(), Some(format!("sha256:{service}-v1")))])
            })
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str, target: Option<&str>) -> Result<()> {
        let fail_on = self.fail_on.read().unwrap();
        if fail_on.contains(operation) {
            bail!("Mock failure on: {}", operation);
        }
        if let Some(target) = target {
            let scoped = format!("{operation}:{target}");
            if fail_on.contains(&scoped) {
                bail!("Mock failure on: {}", scoped);
            }
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeRuntime for MockRuntime {
    fn is_available(&self) -> bool {
        self.record_command("is_available");
        *self.available.read().unwrap()
    }

    fn login(&self, credential: &RegistryCredential) -> Result<()> {
        self.record_command(&format!(
            "login:{}:{}",
            credential.domain, credential.username
        ));
        self.check_fail("login", Some(credential.domain.as_str()))?;
        self.logins.write().unwrap().push(credential.clone());
        Ok(())
    }

    fn logout(&self, registry: &str) -> Result<()> {
        self.record_command(&format!("logout:{}", registry));
        self.check_fail("logout", Some(registry))?;
        Ok(())
    }

    fn pull(&self, service: &Service, skip_buildable: bool) -> Result<()> {
        if skip_buildable {
            self.record_command(&format!("pull:{}:ignore-buildable", service.name));
        } else {
            self.record_command(&format!("pull:{}", service.name));
        }
        self.check_fail("pull", Some(service.name.as_str()))?;
        Ok(())
    }

    fn build(&self, service: &Service, no_cache: bool) -> Result<()> {
        if no_cache {
            self.record_command(&format!("build:{}:no-cache", service.name));
        } else {
            self.record_command(&format!("build:{}", service.name));
        }
        self.check_fail("build", Some(service.name.as_str()))?;
        Ok(())
    }

    fn resolved_images(&self, service: &Service) -> Result<ResolvedImages> {
        self.record_command(&format!("resolved_images:{}", service.name));
        self.check_fail("resolved_images", Some(service.name.as_str()))?;
        Ok(self.resolved_images_of(&service.name))
    }

    fn running_images(&self, service: &Service) -> Result<RunningImages> {
        self.record_command(&format!("running_images:{}", service.name));
        self.check_fail("running_images", Some(service.name.as_str()))?;
        Ok(self.running_images_of(&service.name))
    }

    fn recreate(&self, service: &Service, stop_timeout: Duration) -> Result<()> {
        self.record_command(&format!(
            "recreate:{}:{}",
            service.name,
            stop_timeout.as_secs()
        ));
        self.check_fail("recreate", Some(service.name.as_str()))?;

        let one_shot = self.one_shot.read().unwrap();
        let running: RunningImages = self
            .resolved_images_of(&service.name)
            .into_iter()
            .filter(|(name, _)| !one_shot.contains(&format!("{}/{}", service.name, name)))
            .filter_map(|(name, id)| id.map(|id| (name, BTreeSet::from([id]))))
            .collect();
        self.running
            .write()
            .unwrap()
            .insert(service.name.clone(), running);
        Ok(())
    }

    fn prune_images(&self) -> Result<()> {
        self.record_command("prune:images");
        self.check_fail("prune_images", None)
    }

    fn prune_volumes(&self) -> Result<()> {
        self.record_command("prune:volumes");
        self.check_fail("prune_volumes", None)
    }

    fn prune_build_cache(&self) -> Result<()> {
        self.record_command("prune:build_cache");
        self.check_fail("prune_build_cache", None)
    }

    fn prune_networks(&self) -> Result<()> {
        self.record_command("prune:networks");
        self.check_fail("prune_networks", None)
    }
}
