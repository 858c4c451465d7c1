use clap::Subcommand;
use mockview_core::backend::NewAnswer;
use uuid::Uuid;

use super::{local_time, print_json, CommandResult, Session};

#[derive(Subcommand)]
pub enum AnswerAction {
    /// Submit an answer to a question
    Submit {
        interview_id: Uuid,
        question_id: Uuid,
        answer: String,
    },
    /// List answers for an interview
    List {
        interview_id: Uuid,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: AnswerAction) -> CommandResult {
    let session = Session::load()?;
    let (backend, user) = (&session.backend, &session.user);

    match action {
        AnswerAction::Submit {
            interview_id,
            question_id,
            answer,
        } => {
            if answer.trim().is_empty() {
                return Err("answer is empty".into());
            }
            let saved = backend
                .submit_answer(
                    user,
                    &NewAnswer {
                        interview_id,
                        question_id,
                        answer,
                    },
                )
                .await?;
            println!("Answer saved: {}", saved.id);
        }
        AnswerAction::List { interview_id, json } => {
            let answers = backend.list_answers(user, interview_id).await?;
            if json {
                print_json(&answers)?;
            } else {
                for a in &answers {
                    let score = a.score.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                    println!(
                        "{}  {}  score {}  {}",
                        a.question_id,
                        local_time(&a.created_at),
                        score,
                        a.answer
                    );
                }
            }
        }
    }
    Ok(())
}
