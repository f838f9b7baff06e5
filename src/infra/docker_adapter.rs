use crate::domain::{ComposeRuntime, RegistryCredential, ResolvedImages, RunningImages, Service};
use crate::infra::config::Settings;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::debug;

/// Lines of tool output kept in an error message
const ERROR_TAIL_LINES: usize = 20;

/// Label compose puts on every container it creates
const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// Runs `docker` and `docker compose` as child processes
#[derive(Debug, Clone)]
pub struct DockerAdapter {
    docker: String,
    compose: Vec<String>,
}

impl DockerAdapter {
    pub fn new(docker: impl Into<String>, compose_command: Vec<String>) -> Self {
        Self {
            docker: docker.into(),
            compose: compose_command
                .into_iter()
                .filter(|part| !part.trim().is_empty())
                .collect(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.docker_binary.clone(),
            settings.compose_command.clone(),
        )
    }

    fn docker(&self) -> Command {
        Command::new(&self.docker)
    }

    fn compose_base(&self) -> Command {
        match self.compose.split_first() {
            Some((program, args)) => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            None => {
                let mut cmd = self.docker();
                cmd.arg("compose");
                cmd
            }
        }
    }

    fn compose(&self, service: &Service) -> Command {
        let mut cmd = self.compose_base();
        cmd.arg("-f")
            .arg(&service.compose_file)
            .current_dir(&service.directory);
        cmd
    }

    fn login_command(&self, credential: &RegistryCredential) -> Command {
        let mut cmd = self.docker();
        cmd.args([
            "login",
            "--username",
            credential.username.as_str(),
            "--password-stdin",
            credential.domain.as_str(),
        ]);
        cmd
    }

    fn logout_command(&self, registry: &str) -> Command {
        let mut cmd = self.docker();
        cmd.args(["logout", registry]);
        cmd
    }

    fn pull_command(&self, service: &Service, skip_buildable: bool) -> Command {
        let mut cmd = self.compose(service);
        cmd.arg("pull");
        if skip_buildable {
            cmd.arg("--ignore-buildable");
        }
        cmd
    }

    fn build_command(&self, service: &Service, no_cache: bool) -> Command {
        let mut cmd = self.compose(service);
        cmd.args(["build", "--pull"]);
        if no_cache {
            cmd.arg("--no-cache");
        }
        cmd
    }

    fn config_command(&self, service: &Service) -> Command {
        let mut cmd = self.compose(service);
        cmd.args(["config", "--format", "json"]);
        cmd
    }

    fn image_inspect_command(&self, reference: &str) -> Command {
        let mut cmd = self.docker();
        cmd.args(["image", "inspect", reference]);
        cmd
    }

    fn ps_command(&self, service: &Service) -> Command {
        let mut cmd = self.compose(service);
        cmd.args(["ps", "-q"]);
        cmd
    }

    fn container_inspect_command(&self, containers: &[String]) -> Command {
        let mut cmd = self.docker();
        cmd.args(["container", "inspect"]).args(containers);
        cmd
    }

    fn up_command(&self, service: &Service, stop_timeout: Duration) -> Command {
        let mut cmd = self.compose(service);
        cmd.args(["up", "-d", "--force-recreate", "--timeout"])
            .arg(stop_timeout.as_secs().to_string());
        cmd
    }

    fn prune_command(&self, kind: &str) -> Command {
        let mut cmd = self.docker();
        cmd.args([kind, "prune", "-f"]);
        cmd
    }

    /// Local id of `reference`, or `None` when no such image exists
    fn inspect_image(&self, reference: &str) -> Result<Option<String>> {
        let context = format!("docker image inspect {reference}");
        let mut cmd = self.image_inspect_command(reference);
        debug!("Running {:?}", cmd);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("{context}: cannot spawn process"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() && is_missing_image(&stderr) {
            debug!("{} is not present locally", reference);
            return Ok(None);
        }
        ensure_success(output.status, &stdout, &stderr, &context)?;

        parse_image_inspect(&stdout)
            .map(Some)
            .with_context(|| format!("decoding output of {context}"))
    }
}

impl ComposeRuntime for DockerAdapter {
    fn is_available(&self) -> bool {
        let mut compose = self.compose_base();
        compose.arg("version");
        succeeds(self.docker().arg("--version")) && succeeds(&mut compose)
    }

    fn login(&self, credential: &RegistryCredential) -> Result<()> {
        let context = format!("docker login {}", credential.domain);

        let mut child = self
            .login_command(credential)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("{context}: cannot spawn {}", self.docker))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(credential.password.as_bytes())
                .with_context(|| format!("{context}: writing password"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("{context}: waiting for process"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log_output(&stdout, &stderr);
        ensure_success(output.status, &stdout, &stderr, &context)
    }

    fn logout(&self, registry: &str) -> Result<()> {
        capture(self.logout_command(registry), &format!("docker logout {registry}")).map(drop)
    }

    fn pull(&self, service: &Service, skip_buildable: bool) -> Result<()> {
        stream(
            self.pull_command(service, skip_buildable),
            &format!("compose pull for {}", service.name),
        )
    }

    fn build(&self, service: &Service, no_cache: bool) -> Result<()> {
        stream(
            self.build_command(service, no_cache),
            &format!("compose build for {}", service.name),
        )
    }

    fn resolved_images(&self, service: &Service) -> Result<ResolvedImages> {
        let context = format!("reading compose config of {}", service.name);
        let config = capture(self.config_command(service), &context)?;
        let references = parse_compose_config(&config).with_context(|| context.clone())?;

        let mut images = ResolvedImages::new();
        for (name, reference) in references {
            let id = self.inspect_image(&reference)?;
            images.insert(name, id);
        }
        Ok(images)
    }

    fn running_images(&self, service: &Service) -> Result<RunningImages> {
        let containers = parse_id_lines(&capture(
            self.ps_command(service),
            &format!("listing containers of {}", service.name),
        )?);

        if containers.is_empty() {
            return Ok(RunningImages::new());
        }

        let output = capture(
            self.container_inspect_command(&containers),
            &format!("inspecting containers of {}", service.name),
        )?;

        parse_container_inspect(&output)
            .with_context(|| format!("decoding container inspect output for {}", service.name))
    }

    fn recreate(&self, service: &Service, stop_timeout: Duration) -> Result<()> {
        stream(
            self.up_command(service, stop_timeout),
            &format!("compose up for {}", service.name),
        )
    }

    fn prune_images(&self) -> Result<()> {
        prune(self.prune_command("image"), "image")
    }

    fn prune_volumes(&self) -> Result<()> {
        prune(self.prune_command("volume"), "volume")
    }

    fn prune_build_cache(&self) -> Result<()> {
        prune(self.prune_command("builder"), "builder")
    }

    fn prune_networks(&self) -> Result<()> {
        prune(self.prune_command("network"), "network")
    }
}

#[derive(Deserialize)]
struct ComposeConfig {
    name: String,
    #[serde(default)]
    services: BTreeMap<String, ComposeConfigService>,
}

#[derive(Deserialize)]
struct ComposeConfigService {
    image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspect {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerInspect {
    image: String,
    #[serde(default)]
    state: ContainerStateInspect,
    #[serde(default)]
    config: ContainerConfigInspect,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ContainerStateInspect {
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfigInspect {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

/// One id per line, as printed by `ps -q`
fn parse_id_lines(output: &str) -> Vec<String> {
    let mut ids: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Image reference of each compose service. Services without an `image`
/// key get the `<project>-<service>` name compose gives built images.
fn parse_compose_config(output: &str) -> Result<BTreeMap<String, String>> {
    let config: ComposeConfig = serde_json::from_str(output)?;
    Ok(config
        .services
        .into_iter()
        .map(|(name, svc)| {
            let reference = svc
                .image
                .unwrap_or_else(|| format!("{}-{}", config.name, name));
            (name, reference)
        })
        .collect())
}

fn parse_image_inspect(output: &str) -> Result<String> {
    let images: Vec<ImageInspect> = serde_json::from_str(output)?;
    match images.into_iter().next() {
        Some(image) => Ok(image.id),
        None => bail!("image inspect returned no images"),
    }
}

fn parse_container_inspect(output: &str) -> Result<RunningImages> {
    let containers: Vec<ContainerInspect> = serde_json::from_str(output)?;
    let mut images = RunningImages::new();
    for container in containers.into_iter().filter(|c| c.state.running) {
        let service = container
            .config
            .labels
            .as_ref()
            .and_then(|labels| labels.get(COMPOSE_SERVICE_LABEL));
        match service {
            Some(service) => {
                images
                    .entry(service.clone())
                    .or_default()
                    .insert(container.image);
            }
            None => debug!("Container on {} has no compose service label", container.image),
        }
    }
    Ok(images)
}

fn is_missing_image(stderr: &str) -> bool {
    stderr.to_lowercase().contains("no such image")
}

fn prune(cmd: Command, kind: &str) -> Result<()> {
    capture(cmd, &format!("docker {kind} prune")).map(drop)
}

fn succeeds(cmd: &mut Command) -> bool {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Runs a command whose output is parsed, returning its stdout
fn capture(mut cmd: Command, context: &str) -> Result<String> {
    debug!("Running {:?}", cmd);

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("{context}: cannot spawn process"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    log_output(&stdout, &stderr);
    ensure_success(output.status, &stdout, &stderr, context)?;

    Ok(stdout.into_owned())
}

/// Runs a long command with its output passed through to the terminal.
/// Stderr is echoed line by line and kept for the error message.
fn stream(mut cmd: Command, context: &str) -> Result<()> {
    debug!("Running {:?}", cmd);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("{context}: cannot spawn process"))?;

    let mut stderr = String::new();
    if let Some(pipe) = child.stderr.take() {
        for line in BufReader::new(pipe).lines() {
            let line = line.with_context(|| format!("{context}: reading output"))?;
            eprintln!("{line}");
            stderr.push_str(&line);
            stderr.push('\n');
        }
    }

    let status = child
        .wait()
        .with_context(|| format!("{context}: waiting for process"))?;
    ensure_success(status, "", &stderr, context)
}

fn log_output(stdout: &str, stderr: &str) {
    if !stdout.trim().is_empty() {
        debug!("stdout:\n{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        debug!("stderr:\n{}", stderr.trim_end());
    }
}

fn ensure_success(status: ExitStatus, stdout: &str, stderr: &str, context: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    let detail = if stderr.trim().is_empty() {
        tail(stdout, ERROR_TAIL_LINES)
    } else {
        tail(stderr, ERROR_TAIL_LINES)
    };

    if detail.is_empty() {
        bail!("{context} exited with {status}")
    }
    bail!("{context} exited with {status}: {detail}")
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
