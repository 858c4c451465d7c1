pub mod admin;
pub mod answer;
pub mod auth;
pub mod config;
pub mod interview;
pub mod notification;
pub mod question;
pub mod tokens;

use chrono::{DateTime, Local, Utc};
use mockview_core::storage::KeyringStore;
use mockview_core::{BackendClient, Config, UserContext};
use serde::Serialize;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// What every backend command needs: config, client, signed-in user.
pub struct Session {
    pub config: Config,
    pub backend: BackendClient,
    pub user: UserContext,
}

impl Session {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let backend = BackendClient::from_config(&config.backend)?;
        let user = config
            .user_context(&KeyringStore::default())
            .map_err(|e| format!("{e} (run `mockview-cli auth login` first)"))?;
        Ok(Self {
            config,
            backend,
            user,
        })
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
