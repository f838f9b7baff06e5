use std::fmt;

/// Login for one private registry, as read from the credentials file
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredential {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl RegistryCredential {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
