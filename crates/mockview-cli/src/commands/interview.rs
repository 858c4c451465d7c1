use clap::Subcommand;
use mockview_core::backend::NewInterview;
use mockview_core::Interview;
use serde::Serialize;
use uuid::Uuid;

use super::{local_time, print_json, CommandResult, Session};

#[derive(Subcommand)]
pub enum InterviewAction {
    /// List your interviews, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show an interview with its questions and answers
    Show {
        id: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Create a new interview
    Create {
        /// Job role being interviewed for
        #[arg(long)]
        role: String,
        #[arg(long)]
        description: Option<String>,
        /// Years of experience
        #[arg(long)]
        experience: Option<u32>,
        /// Comma-separated technologies
        #[arg(long)]
        tech_stack: Option<String>,
    },
}

pub(super) fn print_interview_row(interview: &Interview) {
    println!(
        "{}  {:<11}  {}  {}",
        interview.id,
        interview.status.as_str(),
        local_time(&interview.created_at),
        interview.job_role
    );
}

pub async fn run(action: InterviewAction) -> CommandResult {
    let session = Session::load()?;
    let (backend, user) = (&session.backend, &session.user);

    match action {
        InterviewAction::List { json } => {
            let interviews = backend.list_interviews(user).await?;
            if json {
                print_json(&interviews)?;
            } else if interviews.is_empty() {
                println!("No interviews yet.");
            } else {
                interviews.iter().for_each(print_interview_row);
            }
        }
        InterviewAction::Show { id, json } => {
            let interview = backend.get_interview(user, id).await?;
            let questions = backend.list_questions(user, id).await?;
            let answers = backend.list_answers(user, id).await?;

            if json {
                #[derive(Serialize)]
                struct Detail<'a> {
                    #[serde(flatten)]
                    interview: &'a Interview,
                    questions: &'a [mockview_core::InterviewQuestion],
                    answers: &'a [mockview_core::InterviewAnswer],
                }
                print_json(&Detail {
                    interview: &interview,
                    questions: &questions,
                    answers: &answers,
                })?;
                return Ok(());
            }

            println!("{} ({})", interview.job_role, interview.status.as_str());
            if let Some(description) = &interview.job_description {
                println!("{description}");
            }
            if let Some(years) = interview.experience_years {
                println!("Experience: {years} years");
            }
            if let Some(stack) = &interview.tech_stack {
                println!("Tech stack: {stack}");
            }
            for question in &questions {
                println!();
                println!("Q{}. {}", question.position, question.question);
                for answer in answers.iter().filter(|a| a.question_id == question.id) {
                    println!("   > {}", answer.answer);
                    if let Some(feedback) = &answer.feedback {
                        println!("   feedback: {feedback}");
                    }
                    if let Some(score) = answer.score {
                        println!("   score: {score}");
                    }
                }
            }
        }
        InterviewAction::Create {
            role,
            description,
            experience,
            tech_stack,
        } => {
            let created = backend
                .create_interview(
                    user,
                    &NewInterview {
                        job_role: role,
                        job_description: description,
                        experience_years: experience,
                        tech_stack,
                    },
                )
                .await?;
            println!("Interview created: {}", created.id);
        }
    }
    Ok(())
}
