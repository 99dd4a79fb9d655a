// SPDX-License-Identifier: MIT
//! Generation transports.
//!
//! The gateway talks to exactly one [`GenerationTransport`]. Two live
//! implementations exist: [`LambdaTransport`] relays assembled requests to a
//! pre-deployed relay endpoint, and [`DirectTransport`] calls the model
//! provider's `generateContent` API itself. Tests substitute their own.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::AppError;

/// Prompt inputs for a resume draft. The activity context is already
/// rendered; transports never see raw records.
#[derive(Debug)]
pub struct ResumePrompt<'a> {
    pub company_info: &'a str,
    pub job_type: &'a str,
    pub question: &'a str,
    pub activity_context: &'a str,
}

/// Prompt inputs for interview-question generation.
#[derive(Debug)]
pub struct InterviewPrompt<'a> {
    pub company_info: &'a str,
    pub job_type: Option<&'a str>,
    pub activity_context: &'a str,
}

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// False when the deployment is missing the endpoint or credential this
    /// transport needs. The gateway checks this before assembling anything.
    fn is_configured(&self) -> bool;

    /// Produce the raw draft text for a resume answer.
    async fn generate_resume(&self, prompt: &ResumePrompt<'_>) -> Result<String, AppError>;

    /// Produce the provider's raw question payload. Shape is normalized by
    /// the gateway, not here.
    async fn generate_interview(&self, prompt: &InterviewPrompt<'_>) -> Result<Value, AppError>;
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build http client: {e}")))
}

fn transport_error(action: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Generation(format!("{action} timed out"))
    } else {
        AppError::Generation(format!("{action} failed: {err}"))
    }
}

// ─── Lambda relay ─────────────────────────────────────────────────────────────

/// Relays generation requests to dedicated resume/interview relay endpoints.
/// The relay owns the provider credentials; this process only ships the
/// assembled inputs.
pub struct LambdaTransport {
    client: reqwest::Client,
    resume_url: Option<String>,
    interview_url: Option<String>,
}

impl LambdaTransport {
    pub fn new(
        resume_url: Option<String>,
        interview_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client(timeout)?,
            resume_url,
            interview_url,
        })
    }

    async fn post(&self, url: &str, body: Value, action: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(action, e))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| transport_error(action, e))?;

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("upstream error");
            return Err(AppError::Generation(format!(
                "{action} returned {status}: {message}"
            )));
        }

        // Some relay stacks double-encode the body as a JSON string.
        if let Value::String(inner) = &payload {
            return serde_json::from_str(inner)
                .map_err(|e| AppError::ResponseFormat(format!("{action}: invalid relay body: {e}")));
        }
        Ok(payload)
    }
}

#[async_trait]
impl GenerationTransport for LambdaTransport {
    fn is_configured(&self) -> bool {
        self.resume_url.is_some() && self.interview_url.is_some()
    }

    async fn generate_resume(&self, prompt: &ResumePrompt<'_>) -> Result<String, AppError> {
        let url = self
            .resume_url
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("resume endpoint not configured".into()))?;

        let body = json!({
            "companyInfo": prompt.company_info,
            "jobType": prompt.job_type,
            "question": prompt.question,
            "activityData": prompt.activity_context,
        });
        let payload = self.post(url, body, "resume generation").await?;

        payload
            .pointer("/data/draft")
            .or_else(|| payload.get("draft"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                AppError::ResponseFormat("resume relay response missing draft text".into())
            })
    }

    async fn generate_interview(&self, prompt: &InterviewPrompt<'_>) -> Result<Value, AppError> {
        let url = self.interview_url.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("interview endpoint not configured".into())
        })?;

        let body = json!({
            "companyInfo": prompt.company_info,
            "jobType": prompt.job_type,
            "activityData": prompt.activity_context,
        });
        let payload = self.post(url, body, "interview generation").await?;

        Ok(payload.get("data").cloned().unwrap_or(payload))
    }
}

// ─── Direct provider ──────────────────────────────────────────────────────────

/// Calls the provider's `generateContent` endpoint directly with this
/// process's own API key.
pub struct DirectTransport {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl DirectTransport {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
            model,
            api_key,
        })
    }

    async fn generate_content(&self, prompt_text: String, json_mode: bool) -> Result<String, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("provider API key not configured".into()))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={key}",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt_text }] }],
        });
        if json_mode {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("content generation", e))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| transport_error("content generation", e))?;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("upstream error");
            return Err(AppError::Generation(format!(
                "provider returned {status}: {message}"
            )));
        }

        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AppError::ResponseFormat("provider response missing text part".into()))
    }
}

#[async_trait]
impl GenerationTransport for DirectTransport {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_resume(&self, prompt: &ResumePrompt<'_>) -> Result<String, AppError> {
        let text = format!(
            "You are helping a student answer a job-application question.\n\
             Company: {}\nRole: {}\nQuestion: {}\n\nActivity records:\n{}\n\n\
             Write a first-person draft answer grounded only in the records above.",
            prompt.company_info, prompt.job_type, prompt.question, prompt.activity_context
        );
        self.generate_content(text, false).await
    }

    async fn generate_interview(&self, prompt: &InterviewPrompt<'_>) -> Result<Value, AppError> {
        let role = prompt.job_type.unwrap_or("unspecified");
        let text = format!(
            "You are preparing a student for a job interview.\n\
             Company: {}\nRole: {role}\n\nActivity records:\n{}\n\n\
             Return a JSON array of at most 5 objects, each with string fields \
             \"question\", \"intent\", and \"tip\", tailored to the records above.",
            prompt.company_info, prompt.activity_context
        );
        let raw = self.generate_content(text, true).await?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::ResponseFormat(format!("provider returned non-JSON questions: {e}")))
    }
}
