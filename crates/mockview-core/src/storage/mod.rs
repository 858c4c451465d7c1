mod config;
pub mod keyring_store;

pub use config::{AppConfig, BackendConfig, CheckoutConfig, Config, SessionConfig};
pub use keyring_store::{CredentialStore, KeyringStore};

use std::path::PathBuf;

/// Returns `~/.config/mockview[-dev]/` based on MOCKVIEW_ENV.
///
/// Set MOCKVIEW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MOCKVIEW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mockview-dev")
    } else {
        base_dir.join("mockview")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
