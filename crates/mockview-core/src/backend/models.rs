//! Rows of the hosted database tables.
//!
//! Unknown columns are ignored; optional columns default when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Pending => "pending",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
        }
    }
}

/// `interviews` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_role: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub status: InterviewStatus,
    pub created_at: DateTime<Utc>,
}

/// Columns supplied when creating an interview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInterview {
    pub job_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<String>,
}

/// `interview_questions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question: String,
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// `interview_answers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub user_id: Uuid,
    pub answer: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnswer {
    pub interview_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
}

/// `profiles` table. One row per user, keyed by the auth user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub tokens: i64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `notifications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
