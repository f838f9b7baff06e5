use crate::domain::RegistryCredential;
use crate::error::{CredentialsError, SetupError};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
struct LoginFields {
    username: String,
    password: String,
}

/// Reads the credentials file. A missing file means no private registries.
pub fn load_credentials(path: &Path) -> Result<Vec<RegistryCredential>, SetupError> {
    if !path.exists() {
        debug!("No credentials file at {:?}", path);
        return Ok(Vec::new());
    }

    let wrap = |source: CredentialsError| SetupError::Credentials {
        path: path.to_path_buf(),
        source,
    };

    let content = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
    let credentials = parse_credentials(&content).map_err(wrap)?;

    info!(
        "Loaded {} registry credential(s) from {:?}",
        credentials.len(),
        path
    );
    Ok(credentials)
}

/// Parses `[{"<domain>": {"username": "..", "password": ".."}}, ...]`.
///
/// Every entry is validated before anything is returned, so a bad entry
/// anywhere in the file rejects the whole file.
pub fn parse_credentials(content: &str) -> Result<Vec<RegistryCredential>, CredentialsError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<BTreeMap<String, LoginFields>> = serde_json::from_str(content)?;
    let mut seen = HashSet::new();
    let mut credentials = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let found = entry.len();
        let mut pairs = entry.into_iter();
        let (domain, fields) = match (pairs.next(), found) {
            (Some(pair), 1) => pair,
            _ => return Err(CredentialsError::KeyCount { index, found }),
        };

        let domain = domain.trim().to_string();
        if domain.is_empty() {
            return Err(CredentialsError::EmptyField {
                index,
                field: "registry domain",
            });
        }
        if fields.username.trim().is_empty() {
            return Err(CredentialsError::EmptyField {
                index,
                field: "username",
            });
        }
        if fields.password.is_empty() {
            return Err(CredentialsError::EmptyField {
                index,
                field: "password",
            });
        }
        if !seen.insert(domain.to_lowercase()) {
            return Err(CredentialsError::Duplicate(domain));
        }

        credentials.push(RegistryCredential::new(
            domain,
            fields.username.trim(),
            fields.password,
        ));
    }

    Ok(credentials)
}
