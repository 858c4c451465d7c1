//! TOML-based application configuration.
//!
//! Stores:
//! - Application origin used to resolve the checkout path
//! - Hosted database URL and public key
//! - Checkout popup geometry, poll interval and browser command
//! - The signed-in user's id (the access token lives in the OS keyring)
//!
//! Configuration is stored at `~/.config/mockview/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::data_dir;
use super::keyring_store::{CredentialStore, ACCESS_TOKEN_KEY};
use crate::error::ConfigError;
use crate::popup::{ScreenSize, CHECKOUT_PATH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POPUP_SIZE};
use crate::tokens::UserContext;

/// Web application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the checkout path is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Hosted database settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    /// Public (anon) API key sent as the `apikey` header.
    #[serde(default)]
    pub anon_key: String,
}

/// Checkout popup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_checkout_path")]
    pub path: String,
    #[serde(default = "default_popup_size")]
    pub width: u32,
    #[serde(default = "default_popup_size")]
    pub height: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Browser executable opened in app mode (e.g. "chromium").
    /// Falls back to the platform opener when unset.
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
}

/// Signed-in user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mockview/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_checkout_path() -> String {
    CHECKOUT_PATH.into()
}
fn default_popup_size() -> u32 {
    DEFAULT_POPUP_SIZE as u32
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            path: default_checkout_path(),
            width: default_popup_size(),
            height: default_popup_size(),
            poll_interval_ms: default_poll_interval_ms(),
            browser: None,
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

impl CheckoutConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn screen(&self) -> ScreenSize {
        ScreenSize::new(self.screen_width as f64, self.screen_height as f64)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mockview"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the key's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Store `access_token` in `store` and record `user_id`. Does not save.
    pub fn sign_in(
        &mut self,
        store: &impl CredentialStore,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<(), ConfigError> {
        store.set(ACCESS_TOKEN_KEY, access_token)?;
        self.session.user_id = Some(user_id.to_string());
        Ok(())
    }

    /// Forget the session and delete the stored token. Does not save.
    pub fn sign_out(&mut self, store: &impl CredentialStore) -> Result<(), ConfigError> {
        self.session = SessionConfig::default();
        store.delete(ACCESS_TOKEN_KEY)
    }

    /// The signed-in user: `session.user_id` plus the token held in `store`.
    ///
    /// The store is only consulted once a user id is configured.
    pub fn user_context(&self, store: &impl CredentialStore) -> Result<UserContext, ConfigError> {
        let raw_id = self
            .session
            .user_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingKey("session.user_id".into()))?;
        let user_id = Uuid::parse_str(raw_id).map_err(|e| ConfigError::InvalidValue {
            key: "session.user_id".into(),
            message: e.to_string(),
        })?;
        let access_token = store
            .get(ACCESS_TOKEN_KEY)?
            .ok_or_else(|| ConfigError::MissingKey(format!("{ACCESS_TOKEN_KEY} (OS keyring)")))?;
        Ok(UserContext::new(user_id, access_token))
    }
}
