use crate::domain::{ComposeRuntime, RunSummary};
use crate::error::SetupError;
use crate::infra::config::{self, Settings};
use crate::infra::credentials::load_credentials;
use crate::infra::{DockerAdapter, ServiceDiscovery, ServiceFilter};
use crate::services::{Orchestrator, RegistryAuthenticator, SystemService, UpdateOptions};
use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "update",
    version,
    about = "Pull or build newer images for compose services and recreate the ones that changed"
)]
pub struct UpdateArgs {
    /// Services to update, comma-separated (example: "couchpotato, medusa")
    #[arg(short = 'c', long = "containers", value_delimiter = ',')]
    pub containers: Vec<String>,

    /// Services to leave alone, comma-separated (ignored with --containers)
    #[arg(short = 'e', long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Recreate containers even when their image did not change
    #[arg(short, long)]
    pub force: bool,

    /// Seconds containers get to stop before being killed [default: 60]
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Directory holding one subdirectory per service
    #[arg(short, long, env = "COMPOSE_UPDATE_ROOT", default_value_t = config::default_root())]
    pub root: String,

    /// Build images without the layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Log out of the registries logged in to once all services are done
    #[arg(long)]
    pub logout: bool,

    /// Do not prune unused images, volumes, build cache and networks
    #[arg(long)]
    pub skip_cleanup: bool,

    /// More output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl UpdateArgs {
    fn update_options(&self, settings: &Settings) -> UpdateOptions {
        UpdateOptions {
            force: self.force,
            stop_timeout: Duration::from_secs(self.timeout.unwrap_or(settings.timeout)),
            no_cache: self.no_cache || settings.no_cache,
        }
    }
}

/// Entry point used by the binary: real Docker, settings read from the root
pub fn run(args: &UpdateArgs) -> Result<RunSummary> {
    let root = config::expand_root(&args.root);
    let settings = config::load_settings(&root)?;
    let runtime = Arc::new(DockerAdapter::from_settings(&settings));

    execute(args, &root, &settings, runtime)
}

/// Runs a complete update against the given runtime.
///
/// Setup happens in order (discovery, credentials, tool check, logins) and
/// any failure there returns a [`SetupError`] before a single service is
/// touched. Per-service failures end up in the returned summary instead.
pub fn execute(
    args: &UpdateArgs,
    root: &Path,
    settings: &Settings,
    runtime: Arc<dyn ComposeRuntime>,
) -> Result<RunSummary> {
    let filter = ServiceFilter::from_lists(&args.containers, &args.exclude);
    let discovery = ServiceDiscovery::new(root, settings.compose_files.clone());
    let services = discovery.select(&filter)?;

    let credentials = load_credentials(&settings.credentials_path(root))?;

    let system_service = Arc::new(SystemService::new(runtime.clone()));
    if !system_service.is_available() {
        return Err(SetupError::ToolUnavailable(format!(
            "{} / {}",
            settings.docker_binary,
            settings.compose_command.join(" ")
        ))
        .into());
    }

    let authenticator = RegistryAuthenticator::new(runtime.clone());
    let logged_in = authenticator.login_all(&credentials)?;

    let orchestrator = Orchestrator::new(runtime, system_service, args.update_options(settings));

    if services.is_empty() {
        warn!("No services selected under {:?}", root);
    } else {
        info!(
            "Updating {} service(s) with a {}s stop timeout",
            services.len(),
            orchestrator.options().stop_timeout.as_secs()
        );
    }

    let summary = orchestrator.update_all(&services);

    if args.logout || settings.logout {
        authenticator.logout_all(&logged_in);
    }

    if !args.skip_cleanup {
        orchestrator.cleanup(&settings.cleanup);
    }

    Ok(summary)
}
