use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One compose project living in its own directory under the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Directory name, used for filtering and reporting
    pub name: String,
    /// Absolute path to the service directory
    pub directory: PathBuf,
    /// Compose file found inside `directory`
    pub compose_file: PathBuf,
    /// Whether any compose service declares a `build` section
    pub has_build: bool,
}

impl Service {
    pub fn new(name: String, directory: PathBuf, compose_file: PathBuf, has_build: bool) -> Self {
        Self {
            name,
            directory,
            compose_file,
            has_build,
        }
    }

    /// Normalized name used when matching `-c` / `-e` entries
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The subset of a compose file needed to decide between build and pull
#[derive(Debug, Default, Deserialize)]
pub struct ComposeDocument {
    #[serde(default)]
    pub services: BTreeMap<String, ComposeServiceEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComposeServiceEntry {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<serde_yml::Value>,
}

impl ComposeDocument {
    pub fn parse(content: &str) -> Result<Self, serde_yml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content)
    }

    pub fn declares_build(&self) -> bool {
        self.services
            .values()
            .any(|svc| svc.build.as_ref().is_some_and(|b| !b.is_null()))
    }
}

/// Line based fallback for compose files the YAML parser rejects
/// (templated or otherwise non-standard files that compose itself accepts).
pub fn scan_for_build_key(content: &str) -> bool {
    content.lines().any(|line| {
        let line = line.trim_start();
        !line.starts_with('#') && line.starts_with("build:")
    })
}
