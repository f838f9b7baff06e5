use anyhow::Result;
use clap::Parser;
use compose_update::cli::update::{UpdateArgs, execute};
use compose_update::domain::{RecreateReason, UpdateAction};
use compose_update::exitcode;
use compose_update::infra::config::Settings;
use compose_update::test_support::MockRuntime;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn args(extra: &[&str]) -> UpdateArgs {
    UpdateArgs::try_parse_from(std::iter::once("update").chain(extra.iter().copied())).unwrap()
}

fn add_service(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("docker-compose.yaml"),
        format!("services:\n  {name}:\n    image: lscr.io/linuxserver/{name}:latest\n"),
    )
    .unwrap();
}

fn media_stack() -> tempfile::TempDir {
    let temp = tempfile::tempdir().unwrap();
    for name in ["sonarr", "radarr", "traefik"] {
        add_service(temp.path(), name);
    }
    temp
}

fn pulled(mock: &MockRuntime) -> Vec<String> {
    mock.get_commands()
        .into_iter()
        .filter_map(|c| c.strip_prefix("pull:").map(str::to_string))
        .collect()
}

#[test]
fn test_every_service_processed_once_without_filters() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());

    let summary = execute(&args(&[]), temp.path(), &Settings::default(), mock.clone())?;

    let names: Vec<&str> = summary.results.iter().map(|r| r.service.as_str()).collect();
    assert_eq!(names, vec!["radarr", "sonarr", "traefik"]);
    assert_eq!(pulled(&mock), vec!["radarr", "sonarr", "traefik"]);
    Ok(())
}

#[test]
fn test_exclude_leaves_service_untouched() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());

    let summary = execute(
        &args(&["-e", "traefik"]),
        temp.path(),
        &Settings::default(),
        mock.clone(),
    )?;

    assert_eq!(pulled(&mock), vec!["radarr", "sonarr"]);
    assert!(summary.find("traefik").is_none());
    assert!(!mock.get_commands().iter().any(|c| c.contains("traefik")));
    Ok(())
}

#[test]
fn test_include_list_is_normalized() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());

    execute(
        &args(&["-c", " SONARR , radarr"]),
        temp.path(),
        &Settings::default(),
        mock.clone(),
    )?;

    assert_eq!(pulled(&mock), vec!["radarr", "sonarr"]);
    Ok(())
}

#[test]
fn test_include_wins_over_exclude() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());

    execute(
        &args(&["-c", "sonarr", "-e", "sonarr"]),
        temp.path(),
        &Settings::default(),
        mock.clone(),
    )?;

    assert_eq!(pulled(&mock), vec!["sonarr"]);
    Ok(())
}

#[test]
fn test_single_credential_logs_in_once() -> Result<()> {
    let temp = media_stack();
    fs::write(
        temp.path().join(".docker-update"),
        r#"[{"registry.example.com":{"username":"u","password":"p"}}]"#,
    )?;
    let mock = Arc::new(MockRuntime::new());

    execute(&args(&[]), temp.path(), &Settings::default(), mock.clone())?;

    let logins = mock.logins();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].domain, "registry.example.com");
    assert_eq!(logins[0].username, "u");
    assert_eq!(logins[0].password, "p");

    let commands = mock.get_commands();
    let login_at = commands.iter().position(|c| c.starts_with("login:")).unwrap();
    let first_pull = commands.iter().position(|c| c.starts_with("pull:")).unwrap();
    assert!(login_at < first_pull, "login must happen before any pull");
    Ok(())
}

#[test]
fn test_second_run_skips_everything() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());
    let settings = Settings::default();

    let first = execute(&args(&[]), temp.path(), &settings, mock.clone())?;
    assert_eq!(first.count(UpdateAction::Recreated), 3);

    let second = execute(&args(&[]), temp.path(), &settings, mock.clone())?;
    assert_eq!(second.count(UpdateAction::Skipped), 3);
    assert_eq!(second.exit_code(), exitcode::OK);
    Ok(())
}

#[test]
fn test_second_run_skips_project_with_one_shot_job() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let dir = temp.path().join("wiki");
    fs::create_dir(&dir)?;
    fs::write(
        dir.join("compose.yaml"),
        "services:\n  web:\n    image: wiki:latest\n  migrate:\n    image: wiki-migrate:latest\n",
    )?;
    let mock = Arc::new(MockRuntime::new());
    mock.publish_images(
        "wiki",
        &[("web", Some("sha256:web")), ("migrate", Some("sha256:mig"))],
    );
    mock.mark_one_shot("wiki", "migrate");
    let settings = Settings::default();

    let first = execute(&args(&[]), temp.path(), &settings, mock.clone())?;
    assert_eq!(first.count(UpdateAction::Recreated), 1);

    let second = execute(&args(&[]), temp.path(), &settings, mock.clone())?;
    assert_eq!(second.count(UpdateAction::Skipped), 1);
    Ok(())
}

#[test]
fn test_only_updated_image_is_recreated() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());
    for name in ["sonarr", "radarr", "traefik"] {
        mock.publish_image(name, "sha256:old");
        mock.set_running(name, "sha256:old");
    }
    mock.publish_image("radarr", "sha256:new");

    let summary = execute(&args(&["-t", "30"]), temp.path(), &Settings::default(), mock.clone())?;

    let radarr = summary.find("radarr").unwrap();
    assert_eq!(radarr.action, UpdateAction::Recreated);
    assert_eq!(radarr.reason, Some(RecreateReason::ImageChanged));
    assert_eq!(summary.find("sonarr").unwrap().action, UpdateAction::Skipped);
    assert_eq!(summary.find("traefik").unwrap().action, UpdateAction::Skipped);

    let recreates: Vec<String> = mock
        .get_commands()
        .into_iter()
        .filter(|c| c.starts_with("recreate:"))
        .collect();
    assert_eq!(recreates, vec!["recreate:radarr:30"]);
    Ok(())
}

#[test]
fn test_force_recreates_unchanged_services() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());
    for name in ["sonarr", "radarr", "traefik"] {
        mock.publish_image(name, "sha256:same");
        mock.set_running(name, "sha256:same");
    }

    let summary = execute(&args(&["-f"]), temp.path(), &Settings::default(), mock.clone())?;

    assert_eq!(summary.count(UpdateAction::Recreated), 3);
    assert!(
        summary
            .results
            .iter()
            .all(|r| r.reason == Some(RecreateReason::Forced))
    );
    Ok(())
}

#[test]
fn test_build_service_is_built() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let dir = temp.path().join("custom");
    fs::create_dir(&dir)?;
    fs::write(dir.join("Dockerfile"), "FROM alpine\n")?;
    fs::write(dir.join("compose.yaml"), "services:\n  app:\n    build: .\n")?;
    let mock = Arc::new(MockRuntime::new());

    execute(&args(&["--no-cache"]), temp.path(), &Settings::default(), mock.clone())?;

    let commands = mock.get_commands();
    assert!(commands.contains(&"build:custom:no-cache".to_string()));
    assert!(!commands.contains(&"pull:custom".to_string()));
    Ok(())
}

#[test]
fn test_logout_and_cleanup_after_services() -> Result<()> {
    let temp = media_stack();
    fs::write(
        temp.path().join(".docker-update"),
        r#"[{"ghcr.io":{"username":"bot","password":"token"}}]"#,
    )?;
    let mock = Arc::new(MockRuntime::new());

    execute(&args(&["--logout"]), temp.path(), &Settings::default(), mock.clone())?;

    let commands = mock.get_commands();
    let last_recreate = commands
        .iter()
        .rposition(|c| c.starts_with("recreate:"))
        .unwrap();
    let logout = commands.iter().position(|c| c == "logout:ghcr.io").unwrap();
    let prune = commands.iter().position(|c| c == "prune:images").unwrap();
    assert!(last_recreate < logout);
    assert!(logout < prune);
    Ok(())
}

#[test]
fn test_skip_cleanup_and_settings_toggles() -> Result<()> {
    let temp = media_stack();
    let mock = Arc::new(MockRuntime::new());

    execute(&args(&["--skip-cleanup"]), temp.path(), &Settings::default(), mock.clone())?;
    assert!(!mock.get_commands().iter().any(|c| c.starts_with("prune:")));

    let mock = Arc::new(MockRuntime::new());
    let mut settings = Settings::default();
    settings.cleanup.volumes = false;
    execute(&args(&[]), temp.path(), &settings, mock.clone())?;

    let commands = mock.get_commands();
    assert!(commands.contains(&"prune:images".to_string()));
    assert!(!commands.contains(&"prune:volumes".to_string()));
    Ok(())
}

#[test]
fn test_empty_root_completes() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let mock = Arc::new(MockRuntime::new());

    let summary = execute(&args(&[]), temp.path(), &Settings::default(), mock)?;

    assert!(summary.results.is_empty());
    assert_eq!(summary.exit_code(), exitcode::OK);
    Ok(())
}
