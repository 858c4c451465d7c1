use clap::Subcommand;
use uuid::Uuid;

use super::{print_json, CommandResult, Session};

#[derive(Subcommand)]
pub enum QuestionAction {
    /// List an interview's questions in order
    List {
        interview_id: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Store generated questions for an interview
    Add {
        interview_id: Uuid,
        /// Question texts, in order
        #[arg(required = true, num_args = 1..)]
        questions: Vec<String>,
    },
}

pub async fn run(action: QuestionAction) -> CommandResult {
    let session = Session::load()?;
    let (backend, user) = (&session.backend, &session.user);

    match action {
        QuestionAction::List { interview_id, json } => {
            let questions = backend.list_questions(user, interview_id).await?;
            if json {
                print_json(&questions)?;
            } else {
                for q in &questions {
                    println!("{}  Q{}. {}", q.id, q.position, q.question);
                }
            }
        }
        QuestionAction::Add {
            interview_id,
            questions,
        } => {
            let created = backend.add_questions(user, interview_id, &questions).await?;
            println!("Added {} question(s)", created.len());
        }
    }
    Ok(())
}
