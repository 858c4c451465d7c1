use clap::Subcommand;
use mockview_core::storage::KeyringStore;
use mockview_core::{Config, ConfigError};
use uuid::Uuid;

use super::CommandResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the session issued by the auth provider
    Login {
        /// Auth user id (uuid)
        #[arg(long)]
        user_id: Uuid,
        /// Access token (JWT) for the hosted backend
        #[arg(long)]
        access_token: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Status,
}

pub fn run(action: AuthAction) -> CommandResult {
    let mut config = Config::load()?;
    let store = KeyringStore::default();
    match action {
        AuthAction::Login {
            user_id,
            access_token,
        } => {
            config.sign_in(&store, user_id, &access_token)?;
            config.save()?;
            println!("signed in as {user_id}");
        }
        AuthAction::Logout => {
            config.sign_out(&store)?;
            config.save()?;
            println!("signed out");
        }
        AuthAction::Status => match config.user_context(&store) {
            Ok(user) => println!("signed in as {}", user.user_id),
            Err(ConfigError::MissingKey(_)) => println!("not signed in"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
