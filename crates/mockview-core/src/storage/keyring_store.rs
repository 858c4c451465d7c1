//! Credential storage in the OS keyring.
//!
//! Secrets never go into `config.toml`; only the user id lives there.

use crate::error::ConfigError;

/// Keyring entry holding the signed-in user's access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Somewhere to keep secrets by name.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError>;
    /// Removing a missing entry succeeds.
    fn delete(&self, key: &str) -> Result<(), ConfigError>;
}

/// Thin wrapper around the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    /// Service `mockview`, or `mockview-dev` when MOCKVIEW_ENV=dev.
    fn default() -> Self {
        let service = match std::env::var("MOCKVIEW_ENV").as_deref() {
            Ok("dev") => "mockview-dev",
            _ => "mockview",
        };
        Self::new(service)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, ConfigError> {
        keyring::Entry::new(&self.service, key).map_err(|e| credential_error(key, e))
    }
}

fn credential_error(key: &str, err: keyring::Error) -> ConfigError {
    ConfigError::Credential {
        key: key.to_string(),
        message: err.to_string(),
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(credential_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| credential_error(key, e))
    }

    fn delete(&self, key: &str) -> Result<(), ConfigError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(credential_error(key, e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_given_service() {
        assert_eq!(KeyringStore::new("mockview").service, "mockview");
    }

    #[test]
    fn memory_store_delete_is_idempotent() {
        let store = memory::MemoryStore::default();
        store.set(ACCESS_TOKEN_KEY, "jwt").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("jwt"));
        store.delete(ACCESS_TOKEN_KEY).unwrap();
        store.delete(ACCESS_TOKEN_KEY).unwrap();
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    }
}
