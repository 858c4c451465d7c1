use clap::Subcommand;
use uuid::Uuid;

use super::{local_time, print_json, CommandResult, Session};

#[derive(Subcommand)]
pub enum NotificationAction {
    /// List notifications, newest first
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read
    Read { id: Uuid },
}

pub async fn run(action: NotificationAction) -> CommandResult {
    let session = Session::load()?;
    let (backend, user) = (&session.backend, &session.user);

    match action {
        NotificationAction::List { unread, json } => {
            let mut notifications = backend.list_notifications(user).await?;
            if unread {
                notifications.retain(|n| !n.read);
            }
            if json {
                print_json(&notifications)?;
            } else {
                for n in &notifications {
                    let marker = if n.read { " " } else { "*" };
                    println!("{marker} {}  {}  {}", n.id, local_time(&n.created_at), n.title);
                    if !n.message.is_empty() {
                        println!("    {}", n.message);
                    }
                }
            }
        }
        NotificationAction::Read { id } => {
            backend.mark_notification_read(user, id).await?;
            println!("ok");
        }
    }
    Ok(())
}
