use crate::domain::{ComposeDocument, Service, normalize_name, scan_for_build_key};
use crate::error::SetupError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which discovered services a run should touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ServiceFilter {
    #[default]
    All,
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
}

impl ServiceFilter {
    /// Builds a filter from `-c` / `-e` values. Entries may themselves be
    /// comma-separated; names are trimmed and lowercased. A non-empty
    /// include list wins over the exclude list.
    pub fn from_lists(include: &[String], exclude: &[String]) -> Self {
        let include = normalize_list(include);
        let exclude = normalize_list(exclude);

        if !include.is_empty() {
            if !exclude.is_empty() {
                warn!("Both --containers and --exclude given, ignoring --exclude");
            }
            return Self::Include(include);
        }

        if exclude.is_empty() {
            Self::All
        } else {
            Self::Exclude(exclude)
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(names) => names.contains(key),
            Self::Exclude(names) => !names.contains(key),
        }
    }
}

fn normalize_list(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| item.split(','))
        .map(normalize_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Finds service directories (immediate children of the root holding a compose file)
pub struct ServiceDiscovery {
    root: PathBuf,
    compose_files: Vec<String>,
}

impl ServiceDiscovery {
    pub fn new(root: impl Into<PathBuf>, compose_files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            compose_files,
        }
    }

    /// Lists every service under the root, sorted by directory name
    pub fn discover_all(&self) -> Result<Vec<Service>, SetupError> {
        let root_error = |source: std::io::Error| SetupError::RootDirectory {
            path: self.root.clone(),
            source,
        };

        let root = fs::canonicalize(&self.root).map_err(root_error)?;
        let entries = fs::read_dir(&root).map_err(root_error)?;

        let mut services = Vec::new();

        for entry in entries {
            let path = entry.map_err(root_error)?.path();

            if !path.is_dir() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                debug!("Ignoring {:?} - name is not valid UTF-8", path);
                continue;
            };

            if name.starts_with('.') || name.contains('@') {
                debug!("Ignoring {:?} - hidden or metadata directory", name);
                continue;
            }

            let Some(compose_file) = self.find_compose_file(&path) else {
                debug!("Ignoring {:?} - no compose file", name);
                continue;
            };

            let has_build = detect_build(&compose_file);
            debug!("Service found: {} (build: {})", name, has_build);
            services.push(Service::new(name, path, compose_file, has_build));
        }

        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    /// Discovers services and applies the include/exclude filter
    pub fn select(&self, filter: &ServiceFilter) -> Result<Vec<Service>, SetupError> {
        let discovered = self.discover_all()?;

        if let ServiceFilter::Include(names) = filter {
            for name in names {
                if !discovered.iter().any(|svc| &svc.key() == name) {
                    warn!("Requested service '{}' not found under {:?}", name, self.root);
                }
            }
        }

        Ok(discovered
            .into_iter()
            .filter(|svc| filter.allows(&svc.key()))
            .collect())
    }

    fn find_compose_file(&self, dir: &Path) -> Option<PathBuf> {
        self.compose_files
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

fn detect_build(compose_file: &Path) -> bool {
    let content = match fs::read_to_string(compose_file) {
        Ok(content) => content,
        Err(e) => {
            warn!("Cannot read {:?}: {} (assuming pull)", compose_file, e);
            return false;
        }
    };

    match ComposeDocument::parse(&content) {
        Ok(doc) => doc.declares_build(),
        Err(e) => {
            warn!(
                "Cannot parse {:?} as YAML ({}), scanning for a build key instead",
                compose_file, e
            );
            scan_for_build_key(&content)
        }
    }
}
