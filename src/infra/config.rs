use crate::error::SetupError;
use crate::services::CleanupOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = ".update.toml";
pub const DEFAULT_CREDENTIALS_FILE: &str = ".docker-update";
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COMPOSE_FILES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Root directory used when neither `--root` nor `COMPOSE_UPDATE_ROOT` is set
pub fn default_root() -> String {
    ".".to_string()
}

/// Expands `~` and environment variables in a user supplied root path
pub fn expand_root(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
    }
}

/// Optional per-root settings, read from `.update.toml`
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Seconds containers get to stop before being killed
    pub timeout: u64,
    pub docker_binary: String,
    /// Program plus leading args that invoke compose, e.g. `["docker", "compose"]`
    pub compose_command: Vec<String>,
    /// Compose file names looked for in each service directory, in order
    pub compose_files: Vec<String>,
    /// Credentials file, relative to the root
    pub credentials_file: PathBuf,
    pub no_cache: bool,
    pub logout: bool,
    pub cleanup: CleanupOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STOP_TIMEOUT_SECS,
            docker_binary: "docker".to_string(),
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            compose_files: DEFAULT_COMPOSE_FILES.iter().map(|s| s.to_string()).collect(),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            no_cache: false,
            logout: false,
            cleanup: CleanupOptions::all(),
        }
    }
}

impl Settings {
    pub fn credentials_path(&self, root: &Path) -> PathBuf {
        root.join(&self.credentials_file)
    }

    fn validate(&self) -> Result<(), String> {
        if self.compose_command.iter().all(|part| part.trim().is_empty()) {
            return Err("compose_command must not be empty".to_string());
        }
        if self.docker_binary.trim().is_empty() {
            return Err("docker_binary must not be empty".to_string());
        }
        if self.compose_files.is_empty() {
            return Err("compose_files must list at least one file name".to_string());
        }
        Ok(())
    }
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

/// Loads `.update.toml` from the root, falling back to defaults when absent
pub fn load_settings(root: &Path) -> Result<Settings, SetupError> {
    let path = settings_path(root);

    if !path.exists() {
        debug!("No settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| SetupError::Settings {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    parse_settings(&content, &path)
}

fn parse_settings(content: &str, path: &Path) -> Result<Settings, SetupError> {
    let invalid = |reason: String| SetupError::Settings {
        path: path.to_path_buf(),
        reason,
    };

    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let settings: Settings = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    settings.validate().map_err(invalid)?;

    debug!("Settings loaded from {:?}", path);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_settings_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings(temp.path()).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout, 60);
        assert_eq!(settings.compose_command, vec!["docker", "compose"]);
    }

    #[test]
    fn test_partial_settings_keep_other_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            settings_path(temp.path()),
            r#"
timeout = 120
logout = true

[cleanup]
volumes = false
"#,
        )
        .unwrap();

        let settings = load_settings(temp.path()).unwrap();

        assert_eq!(settings.timeout, 120);
        assert!(settings.logout);
        assert!(!settings.cleanup.volumes);
        assert!(settings.cleanup.images);
        assert_eq!(settings.credentials_file, PathBuf::from(".docker-update"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(settings_path(temp.path()), "timeot = 5\n").unwrap();

        let err = load_settings(temp.path()).unwrap_err();
        assert!(matches!(err, SetupError::Settings { .. }));
    }

    #[test]
    fn test_empty_compose_files_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(settings_path(temp.path()), "compose_files = []\n").unwrap();

        let err = load_settings(temp.path()).unwrap_err();
        assert!(err.to_string().contains("compose_files"));
    }

    #[test]
    fn test_legacy_compose_command() {
        let temp = TempDir::new().unwrap();
        fs::write(
            settings_path(temp.path()),
            "compose_command = [\"docker-compose\"]\n",
        )
        .unwrap();

        let settings = load_settings(temp.path()).unwrap();
        assert_eq!(settings.compose_command, vec!["docker-compose"]);
    }

    #[test]
    fn test_expand_root_tilde() {
        let expanded = expand_root("~/docker");
        assert!(expanded.ends_with("docker"));

        assert_eq!(expand_root("/srv/docker"), PathBuf::from("/srv/docker"));
    }

    #[test]
    fn test_credentials_path_is_relative_to_root() {
        let settings = Settings::default();
        assert_eq!(
            settings.credentials_path(Path::new("/srv/docker")),
            PathBuf::from("/srv/docker/.docker-update")
        );
    }
}
