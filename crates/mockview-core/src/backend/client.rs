//! BackendClient: the hosted database's REST surface.
//!
//! Tables are served under `/rest/v1/<table>` with PostgREST-style filters
//! (`?id=eq.<uuid>`). Row-level security lives on the server; this client
//! only adds the admin role gate in front of admin operations.

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use uuid::Uuid;

use super::models::{
    Interview, InterviewAnswer, InterviewQuestion, NewAnswer, NewInterview, Notification, Profile,
};
use crate::error::{BackendError, ConfigError, CoreError};
use crate::storage::BackendConfig;
use crate::tokens::{BalanceSource, TokenBalance, UserContext};

const INTERVIEWS: &str = "interviews";
const QUESTIONS: &str = "interview_questions";
const ANSWERS: &str = "interview_answers";
const PROFILES: &str = "profiles";
const NOTIFICATIONS: &str = "notifications";

type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Deserialize)]
struct TokensRow {
    tokens: i64,
}

#[derive(Serialize)]
struct InterviewInsert<'a> {
    user_id: Uuid,
    #[serde(flatten)]
    interview: &'a NewInterview,
}

#[derive(Serialize)]
struct QuestionInsert<'a> {
    interview_id: Uuid,
    question: &'a str,
    position: i32,
}

#[derive(Serialize)]
struct AnswerInsert<'a> {
    user_id: Uuid,
    #[serde(flatten)]
    answer: &'a NewAnswer,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Pull a readable message out of an error body.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

/// Client for the hosted database.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    anon_key: String,
    http: Client,
}

impl BackendClient {
    /// Create a client for `base_url` authenticating with the public `anon_key`.
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> BackendResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            anon_key: anon_key.into(),
            http: Client::new(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, CoreError> {
        if config.url.is_empty() {
            return Err(ConfigError::MissingKey("backend.url".into()).into());
        }
        if config.anon_key.is_empty() {
            return Err(ConfigError::MissingKey("backend.anon_key".into()).into());
        }
        Ok(Self::new(&config.url, config.anon_key.clone())?)
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        user: &UserContext,
    ) -> BackendResult<RequestBuilder> {
        let url = self.base.join(&format!("rest/v1/{table}"))?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&user.access_token)
            .header(ACCEPT, "application/json"))
    }

    fn write(&self, method: Method, table: &str, user: &UserContext) -> BackendResult<RequestBuilder> {
        Ok(self
            .request(method, table, user)?
            .header("Prefer", "return=representation"))
    }

    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<Vec<T>> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body, status);
            tracing::debug!(%status, %message, "backend request failed");
            return Err(BackendError::from_status(status, message));
        }
        Ok(resp.json().await?)
    }

    async fn single<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: impl Into<String>,
    ) -> BackendResult<T> {
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(what.into()))
    }

    async fn delete_row<T: DeserializeOwned>(
        &self,
        admin: &UserContext,
        table: &str,
        id: Uuid,
    ) -> BackendResult<T> {
        self.require_admin(admin).await?;
        let request = self
            .write(Method::DELETE, table, admin)?
            .query(&[("id", eq(id))]);
        let row = self.single(request, format!("{table} row {id}")).await?;
        tracing::info!(table, %id, admin_id = %admin.user_id, "row deleted");
        Ok(row)
    }

    // ── Profiles and role gate ───────────────────────────────────────

    pub async fn fetch_profile(&self, user: &UserContext) -> BackendResult<Profile> {
        let request = self
            .request(Method::GET, PROFILES, user)?
            .query(&[("id", eq(user.user_id)), ("select", "*".into())]);
        self.single(request, format!("profile {}", user.user_id)).await
    }

    pub async fn fetch_token_balance(&self, user: &UserContext) -> BackendResult<TokenBalance> {
        let request = self
            .request(Method::GET, PROFILES, user)?
            .query(&[("id", eq(user.user_id)), ("select", "tokens".into())]);
        let row: TokensRow = self
            .single(request, format!("profile {}", user.user_id))
            .await?;
        Ok(TokenBalance(row.tokens))
    }

    pub async fn is_admin(&self, user: &UserContext) -> BackendResult<bool> {
        Ok(self.fetch_profile(user).await?.is_admin)
    }

    /// Fail with `Forbidden` unless the caller's profile has `is_admin` set.
    pub async fn require_admin(&self, user: &UserContext) -> BackendResult<()> {
        if self.is_admin(user).await? {
            Ok(())
        } else {
            tracing::warn!(user_id = %user.user_id, "admin operation refused");
            Err(BackendError::Forbidden("admin role required".into()))
        }
    }

    pub async fn list_profiles(&self, admin: &UserContext) -> BackendResult<Vec<Profile>> {
        self.require_admin(admin).await?;
        let request = self
            .request(Method::GET, PROFILES, admin)?
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.rows(request).await
    }

    /// Overwrite a user's credit balance.
    pub async fn set_token_balance(
        &self,
        admin: &UserContext,
        user_id: Uuid,
        tokens: i64,
    ) -> BackendResult<Profile> {
        self.require_admin(admin).await?;
        let request = self
            .write(Method::PATCH, PROFILES, admin)?
            .query(&[("id", eq(user_id))])
            .json(&json!({ "tokens": tokens }));
        let profile = self.single(request, format!("profile {user_id}")).await?;
        tracing::info!(%user_id, tokens, admin_id = %admin.user_id, "token balance set");
        Ok(profile)
    }

    // ── Interviews ───────────────────────────────────────────────────

    pub async fn list_interviews(&self, user: &UserContext) -> BackendResult<Vec<Interview>> {
        let request = self.request(Method::GET, INTERVIEWS, user)?.query(&[
            ("user_id", eq(user.user_id)),
            ("select", "*".into()),
            ("order", "created_at.desc".into()),
        ]);
        self.rows(request).await
    }

    pub async fn list_all_interviews(&self, admin: &UserContext) -> BackendResult<Vec<Interview>> {
        self.require_admin(admin).await?;
        let request = self
            .request(Method::GET, INTERVIEWS, admin)?
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.rows(request).await
    }

    pub async fn get_interview(&self, user: &UserContext, id: Uuid) -> BackendResult<Interview> {
        let request = self
            .request(Method::GET, INTERVIEWS, user)?
            .query(&[("id", eq(id)), ("select", "*".into())]);
        self.single(request, format!("interview {id}")).await
    }

    pub async fn create_interview(
        &self,
        user: &UserContext,
        interview: &NewInterview,
    ) -> BackendResult<Interview> {
        let request = self
            .write(Method::POST, INTERVIEWS, user)?
            .json(&InterviewInsert {
                user_id: user.user_id,
                interview,
            });
        let created: Interview = self.single(request, "created interview").await?;
        tracing::info!(id = %created.id, job_role = %created.job_role, "interview created");
        Ok(created)
    }

    pub async fn delete_interview(&self, admin: &UserContext, id: Uuid) -> BackendResult<Interview> {
        self.delete_row(admin, INTERVIEWS, id).await
    }

    // ── Questions ────────────────────────────────────────────────────

    pub async fn list_questions(
        &self,
        user: &UserContext,
        interview_id: Uuid,
    ) -> BackendResult<Vec<InterviewQuestion>> {
        let request = self.request(Method::GET, QUESTIONS, user)?.query(&[
            ("interview_id", eq(interview_id)),
            ("select", "*".into()),
            ("order", "position.asc".into()),
        ]);
        self.rows(request).await
    }

    /// Store generated questions for an interview, numbered from 1 in order.
    pub async fn add_questions(
        &self,
        user: &UserContext,
        interview_id: Uuid,
        questions: &[String],
    ) -> BackendResult<Vec<InterviewQuestion>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }
        let body: Vec<QuestionInsert<'_>> = questions
            .iter()
            .enumerate()
            .map(|(i, question)| QuestionInsert {
                interview_id,
                question,
                position: i as i32 + 1,
            })
            .collect();
        let request = self.write(Method::POST, QUESTIONS, user)?.json(&body);
        self.rows(request).await
    }

    pub async fn delete_question(
        &self,
        admin: &UserContext,
        id: Uuid,
    ) -> BackendResult<InterviewQuestion> {
        self.delete_row(admin, QUESTIONS, id).await
    }

    // ── Answers ──────────────────────────────────────────────────────

    pub async fn submit_answer(
        &self,
        user: &UserContext,
        answer: &NewAnswer,
    ) -> BackendResult<InterviewAnswer> {
        let request = self.write(Method::POST, ANSWERS, user)?.json(&AnswerInsert {
            user_id: user.user_id,
            answer,
        });
        self.single(request, "submitted answer").await
    }

    pub async fn list_answers(
        &self,
        user: &UserContext,
        interview_id: Uuid,
    ) -> BackendResult<Vec<InterviewAnswer>> {
        let request = self.request(Method::GET, ANSWERS, user)?.query(&[
            ("interview_id", eq(interview_id)),
            ("select", "*".into()),
            ("order", "created_at.asc".into()),
        ]);
        self.rows(request).await
    }

    pub async fn delete_answer(
        &self,
        admin: &UserContext,
        id: Uuid,
    ) -> BackendResult<InterviewAnswer> {
        self.delete_row(admin, ANSWERS, id).await
    }

    // ── Notifications ────────────────────────────────────────────────

    pub async fn list_notifications(&self, user: &UserContext) -> BackendResult<Vec<Notification>> {
        let request = self.request(Method::GET, NOTIFICATIONS, user)?.query(&[
            ("user_id", eq(user.user_id)),
            ("select", "*".into()),
            ("order", "created_at.desc".into()),
        ]);
        self.rows(request).await
    }

    pub async fn mark_notification_read(
        &self,
        user: &UserContext,
        id: Uuid,
    ) -> BackendResult<Notification> {
        let request = self
            .write(Method::PATCH, NOTIFICATIONS, user)?
            .query(&[("id", eq(id)), ("user_id", eq(user.user_id))])
            .json(&json!({ "read": true }));
        self.single(request, format!("notification {id}")).await
    }
}

impl BalanceSource for BackendClient {
    async fn fetch_balance(&self, user: &UserContext) -> crate::error::Result<TokenBalance> {
        Ok(self.fetch_token_balance(user).await?)
    }
}
