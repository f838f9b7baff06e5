use crate::domain::ComposeRuntime;
use anyhow::Result;
use std::sync::Arc;

/// Daemon-wide Docker operations (availability check, prune)
pub struct SystemService {
    runtime: Arc<dyn ComposeRuntime>,
}

impl SystemService {
    pub fn new(runtime: Arc<dyn ComposeRuntime>) -> Self {
        Self { runtime }
    }

    pub fn is_available(&self) -> bool {
        self.runtime.is_available()
    }

    pub fn prune_images(&self) -> Result<()> {
        self.runtime.prune_images()
    }

    pub fn prune_volumes(&self) -> Result<()> {
        self.runtime.prune_volumes()
    }

    pub fn prune_build_cache(&self) -> Result<()> {
        self.runtime.prune_build_cache()
    }

    pub fn prune_networks(&self) -> Result<()> {
        self.runtime.prune_networks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRuntime;

    #[test]
    fn test_prune_images() {
        let mock = Arc::new(MockRuntime::new());
        let service = SystemService::new(mock.clone());

        assert!(service.prune_images().is_ok());
        assert!(mock.get_commands().contains(&"prune:images".to_string()));
    }

    #[test]
    fn test_prune_volumes() {
        let mock = Arc::new(MockRuntime::new());
        let service = SystemService::new(mock.clone());

        assert!(service.prune_volumes().is_ok());
        assert!(mock.get_commands().contains(&"prune:volumes".to_string()));
    }

    #[test]
    fn test_prune_build_cache() {
        let mock = Arc::new(MockRuntime::new());
        let service = SystemService::new(mock.clone());

        assert!(service.prune_build_cache().is_ok());
        assert!(mock.get_commands().contains(&"prune:build_cache".to_string()));
    }

    #[test]
    fn test_prune_networks() {
        let mock = Arc::new(MockRuntime::new());
        let service = SystemService::new(mock.clone());

        assert!(service.prune_networks().is_ok());
        assert!(mock.get_commands().contains(&"prune:networks".to_string()));
    }

    #[test]
    fn test_availability_passthrough() {
        let mock = Arc::new(MockRuntime::new());
        let service = SystemService::new(mock.clone());
        assert!(service.is_available());

        mock.set_unavailable();
        assert!(!service.is_available());
    }
}
