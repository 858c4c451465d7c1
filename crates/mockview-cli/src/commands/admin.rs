use clap::Subcommand;
use uuid::Uuid;

use super::interview::print_interview_row;
use super::{print_json, CommandResult, Session};

#[derive(Subcommand)]
pub enum AdminAction {
    /// List all users with their balances
    Users {
        #[arg(long)]
        json: bool,
    },
    /// List every interview
    Interviews {
        #[arg(long)]
        json: bool,
    },
    /// Overwrite a user's token balance
    SetTokens {
        user_id: Uuid,
        #[arg(allow_negative_numbers = true)]
        tokens: i64,
    },
    /// Delete an interview
    DeleteInterview { id: Uuid },
    /// Delete a question
    DeleteQuestion { id: Uuid },
    /// Delete an answer
    DeleteAnswer { id: Uuid },
}

pub async fn run(action: AdminAction) -> CommandResult {
    let session = Session::load()?;
    let (backend, admin) = (&session.backend, &session.user);

    match action {
        AdminAction::Users { json } => {
            let profiles = backend.list_profiles(admin).await?;
            if json {
                print_json(&profiles)?;
            } else {
                for p in &profiles {
                    println!(
                        "{}  {:>6}  {}{}",
                        p.id,
                        p.tokens,
                        p.email.as_deref().unwrap_or("-"),
                        if p.is_admin { "  (admin)" } else { "" }
                    );
                }
            }
        }
        AdminAction::Interviews { json } => {
            let interviews = backend.list_all_interviews(admin).await?;
            if json {
                print_json(&interviews)?;
            } else {
                interviews.iter().for_each(print_interview_row);
            }
        }
        AdminAction::SetTokens { user_id, tokens } => {
            if tokens < 0 {
                return Err("token balance cannot be negative".into());
            }
            let profile = backend.set_token_balance(admin, user_id, tokens).await?;
            println!("{}: {} tokens", profile.id, profile.tokens);
        }
        AdminAction::DeleteInterview { id } => {
            backend.delete_interview(admin, id).await?;
            println!("Interview deleted: {id}");
        }
        AdminAction::DeleteQuestion { id } => {
            backend.delete_question(admin, id).await?;
            println!("Question deleted: {id}");
        }
        AdminAction::DeleteAnswer { id } => {
            backend.delete_answer(admin, id).await?;
            println!("Answer deleted: {id}");
        }
    }
    Ok(())
}
