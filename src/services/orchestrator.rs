use crate::domain::{
    ComposeRuntime, RecreateReason, ResolvedImages, RunSummary, RunningImages, Service,
    UpdateResult, UpdateStep,
};
use crate::infra::config::DEFAULT_STOP_TIMEOUT_SECS;
use crate::services::SystemService;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resources pruned after all services were processed
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupOptions {
    pub images: bool,
    pub volumes: bool,
    pub build_cache: bool,
    pub networks: bool,
}

impl CleanupOptions {
    pub fn all() -> Self {
        Self {
            images: true,
            volumes: true,
            build_cache: true,
            networks: true,
        }
    }

    pub fn none() -> Self {
        Self {
            images: false,
            volumes: false,
            build_cache: false,
            networks: false,
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Recreate even when the image did not change
    pub force: bool,
    /// Grace period given to containers on recreate
    pub stop_timeout: Duration,
    /// Pass `--no-cache` to compose build
    pub no_cache: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            force: false,
            stop_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
            no_cache: false,
        }
    }
}

/// Outcome of comparing resolved and running image ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Recreate {
        reason: RecreateReason,
        image_changed: bool,
    },
}

/// Decides whether a service needs its containers recreated.
///
/// Images are compared per compose service. Only compose services with a
/// running container take part, so an exited one-shot container never counts
/// as a change. An image missing locally always does.
pub fn decide(resolved: &ResolvedImages, running: &RunningImages, force: bool) -> Decision {
    let any_running = running.values().any(|ids| !ids.is_empty());
    let image_changed = any_running
        && resolved.iter().any(|(name, id)| match id {
            Some(id) => running
                .get(name)
                .is_some_and(|ids| ids.iter().any(|running_id| running_id != id)),
            None => true,
        });

    if force {
        Decision::Recreate {
            reason: RecreateReason::Forced,
            image_changed,
        }
    } else if !any_running {
        Decision::Recreate {
            reason: RecreateReason::NotRunning,
            image_changed,
        }
    } else if image_changed {
        Decision::Recreate {
            reason: RecreateReason::ImageChanged,
            image_changed,
        }
    } else {
        Decision::Skip
    }
}

/// Runs the pull/build, compare, recreate sequence over each service
pub struct Orchestrator {
    runtime: Arc<dyn ComposeRuntime>,
    system_service: Arc<SystemService>,
    options: UpdateOptions,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ComposeRuntime>,
        system_service: Arc<SystemService>,
        options: UpdateOptions,
    ) -> Self {
        Self {
            runtime,
            system_service,
            options,
        }
    }

    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    /// Updates services one at a time, in the given order. A failing service
    /// is recorded and the next one is still processed.
    pub fn update_all(&self, services: &[Service]) -> RunSummary {
        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(services.len());

        for service in services {
            if !seen.insert(service.key()) {
                warn!("Service {} listed twice, processing it once", service.name);
                continue;
            }

            let result = self.update_service(service);
            if !result.is_failure() {
                info!("{}: {}", result.service, result);
            }
            results.push(result);
        }

        RunSummary::new(results)
    }

    /// Runs the whole update sequence for one service
    pub fn update_service(&self, service: &Service) -> UpdateResult {
        info!("Checking {} for updates...", service.name);

        if service.has_build {
            if let Err(e) = self.runtime.build(service, self.options.no_cache) {
                return fail(service, UpdateStep::Build, e);
            }
            // Images of the project's other services are still pulled
            if let Err(e) = self.runtime.pull(service, true) {
                return fail(service, UpdateStep::Pull, e);
            }
        } else if let Err(e) = self.runtime.pull(service, false) {
            return fail(service, UpdateStep::Pull, e);
        }

        let resolved = match self.runtime.resolved_images(service) {
            Ok(ids) => ids,
            Err(e) => return fail(service, UpdateStep::Inspect, e),
        };
        let running = match self.runtime.running_images(service) {
            Ok(ids) => ids,
            Err(e) => return fail(service, UpdateStep::Inspect, e),
        };
        debug!(
            "{}: resolved {:?}, running {:?}",
            service.name, resolved, running
        );

        match decide(&resolved, &running, self.options.force) {
            Decision::Skip => UpdateResult::skipped(&service.name),
            Decision::Recreate {
                reason,
                image_changed,
            } => {
                info!("Recreating {} ({})...", service.name, reason);
                match self.runtime.recreate(service, self.options.stop_timeout) {
                    Ok(_) => UpdateResult::recreated(&service.name, image_changed, reason),
                    Err(e) => fail(service, UpdateStep::Recreate, e),
                }
            }
        }
    }

    /// Prunes Docker resources, continuing even if individual operations fail
    pub fn cleanup(&self, options: &CleanupOptions) {
        if *options == CleanupOptions::none() {
            return;
        }

        info!("Pruning unused Docker resources...");

        if options.images {
            match self.system_service.prune_images() {
                Ok(_) => debug!("Images pruned"),
                Err(e) => warn!("Image prune failed: {:#}", e),
            }
        }

        if options.volumes {
            match self.system_service.prune_volumes() {
                Ok(_) => debug!("Volumes pruned"),
                Err(e) => warn!("Volume prune failed: {:#}", e),
            }
        }

        if options.build_cache {
            match self.system_service.prune_build_cache() {
                Ok(_) => debug!("Build cache pruned"),
                Err(e) => warn!("Build cache prune failed: {:#}", e),
            }
        }

        if options.networks {
            match self.system_service.prune_networks() {
                Ok(_) => debug!("Networks pruned"),
                Err(e) => warn!("Network prune failed: {:#}", e),
            }
        }
    }
}

fn fail(service: &Service, step: UpdateStep, err: anyhow::Error) -> UpdateResult {
    error!("{} failed at {}: {:#}", service.name, step, err);
    UpdateResult::failed(&service.name, step, format!("{err:#}"))
}
