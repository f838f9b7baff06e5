use crate::domain::{ComposeRuntime, RegistryCredential};
use crate::error::SetupError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Logs the container tool in to private registries before any pull
pub struct RegistryAuthenticator {
    runtime: Arc<dyn ComposeRuntime>,
}

impl RegistryAuthenticator {
    pub fn new(runtime: Arc<dyn ComposeRuntime>) -> Self {
        Self { runtime }
    }

    /// Logs in to every registry in order. The first rejected login aborts
    /// the run, and the remaining registries are not attempted.
    ///
    /// # Returns
    /// The registries logged in to, for a later [`Self::logout_all`]
    pub fn login_all(&self, credentials: &[RegistryCredential]) -> Result<Vec<String>, SetupError> {
        let mut logged_in = Vec::with_capacity(credentials.len());

        for credential in credentials {
            info!(
                "Logging in to {} as {}",
                credential.domain, credential.username
            );

            self.runtime
                .login(credential)
                .map_err(|e| SetupError::Login {
                    registry: credential.domain.clone(),
                    detail: format!("{e:#}"),
                })?;

            logged_in.push(credential.domain.clone());
        }

        Ok(logged_in)
    }

    /// Logs out of each registry, continuing past failures
    pub fn logout_all(&self, registries: &[String]) {
        for registry in registries {
            match self.runtime.logout(registry) {
                Ok(_) => debug!("Logged out of {}", registry),
                Err(e) => warn!("Logout from {} failed: {:#}", registry, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRuntime;

    #[test]
    fn test_login_each_registry_once() {
        let mock = Arc::new(MockRuntime::new());
        let auth = RegistryAuthenticator::new(mock.clone());

        let creds = vec![RegistryCredential::new("registry.example.com", "u", "p")];
        let logged_in = auth.login_all(&creds).unwrap();

        assert_eq!(logged_in, vec!["registry.example.com"]);
        assert_eq!(mock.logins(), creds);
        assert_eq!(
            mock.get_commands(),
            vec!["login:registry.example.com:u".to_string()]
        );
    }

    #[test]
    fn test_no_credentials_is_noop() {
        let mock = Arc::new(MockRuntime::new());
        let auth = RegistryAuthenticator::new(mock.clone());

        assert!(auth.login_all(&[]).unwrap().is_empty());
        assert!(mock.get_commands().is_empty());
    }

    #[test]
    fn test_login_failure_stops_at_first_rejection() {
        let mock = Arc::new(MockRuntime::new());
        mock.set_fail_on("login:b.io");
        let auth = RegistryAuthenticator::new(mock.clone());

        let creds = vec![
            RegistryCredential::new("a.io", "u", "p"),
            RegistryCredential::new("b.io", "u", "p"),
            RegistryCredential::new("c.io", "u", "p"),
        ];

        let err = auth.login_all(&creds).unwrap_err();
        match err {
            SetupError::Login { registry, .. } => assert_eq!(registry, "b.io"),
            other => panic!("unexpected error: {other}"),
        }

        let commands = mock.get_commands();
        assert!(!commands.iter().any(|c| c.starts_with("login:c.io")));
    }

    #[test]
    fn test_logout_continues_on_failure() {
        let mock = Arc::new(MockRuntime::new());
        mock.set_fail_on("logout:a.io");
        let auth = RegistryAuthenticator::new(mock.clone());

        auth.logout_all(&["a.io".to_string(), "b.io".to_string()]);

        let commands = mock.get_commands();
        assert!(commands.contains(&"logout:a.io".to_string()));
        assert!(commands.contains(&"logout:b.io".to_string()));
    }
}
