//! Advisor copilot.
//!
//! Answers advisor questions about one client. Every answer is grounded in
//! an analytics snapshot of that client; when a host LLM is available it
//! phrases the answer, otherwise a deterministic offline answer is used.

pub mod anthropic;
pub mod fallback;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::storage::WealthStore;
use crate::types::{AnswerSource, ChatTurn, Client};
pub use fallback::Intent;
use prompt::ClientContext;

/// Abstraction over a text-completion host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmHost: Send + Sync {
    /// Complete a prompt under a system instruction.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> &str;

    /// Calls and tokens spent so far, for hosts that track them.
    fn usage(&self) -> Option<HostUsage> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostUsage {
    pub calls: u64,
    pub tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
    pub intent: Intent,
}

pub struct Copilot {
    host: Option<Box<dyn LlmHost>>,
    config: AnalyticsConfig,
}

impl Copilot {
    pub fn new(host: Option<Box<dyn LlmHost>>, config: AnalyticsConfig) -> Self {
        Self { host, config }
    }

    /// A copilot that only gives offline answers.
    pub fn offline(config: AnalyticsConfig) -> Self {
        Self::new(None, config)
    }

    pub fn is_online(&self) -> bool {
        self.host.is_some()
    }

    pub fn host_model(&self) -> Option<&str> {
        self.host.as_ref().map(|h| h.model_name())
    }

    pub fn host_usage(&self) -> Option<HostUsage> {
        self.host.as_ref().and_then(|h| h.usage())
    }

    /// Answer a question about a client.
    pub async fn ask(&self, client: &Client, question: &str, today: NaiveDate) -> Answer {
        let ctx = ClientContext::gather(client, today, &self.config);
        let intent = Intent::classify(question);

        if !question.trim().is_empty() {
            let user_prompt = prompt::question_prompt(&ctx, question);
            if let Some(text) = self.call_host(&client.id, &user_prompt).await {
                return Answer { text, source: AnswerSource::Host, intent };
            }
        }

        debug!(client_id = %client.id, ?intent, "Using offline answer");
        Answer {
            text: fallback::answer(intent, client, &ctx, &self.config),
            source: AnswerSource::Fallback,
            intent,
        }
    }

    /// Pre-meeting summary of a client.
    pub async fn meeting_brief(&self, client: &Client, today: NaiveDate) -> Answer {
        let ctx = ClientContext::gather(client, today, &self.config);

        if let Some(text) = self.call_host(&client.id, &prompt::brief_prompt(&ctx)).await {
            return Answer { text, source: AnswerSource::Host, intent: Intent::Summary };
        }

        Answer {
            text: fallback::brief(&ctx),
            source: AnswerSource::Fallback,
            intent: Intent::Summary,
        }
    }

    /// Ask and record both sides of the exchange in the client's history.
    pub async fn converse(
        &self,
        store: &WealthStore,
        client: &Client,
        question: &str,
        today: NaiveDate,
    ) -> Result<Answer> {
        let asked_at = Utc::now();
        let answer = self.ask(client, question, today).await;
        self.record_exchange(store, &client.id, question, asked_at, &answer)?;
        Ok(answer)
    }

    /// Append a question and its answer to the client's history. Kept apart
    /// from `ask` so callers can persist without holding locks across the
    /// host call.
    pub fn record_exchange(
        &self,
        store: &WealthStore,
        client_id: &str,
        question: &str,
        asked_at: DateTime<Utc>,
        answer: &Answer,
    ) -> Result<()> {
        store.append_chat(
            client_id,
            &[
                ChatTurn {
                    source: AnswerSource::Advisor,
                    text: question.trim().to_string(),
                    at: asked_at,
                },
                ChatTurn {
                    source: answer.source,
                    text: answer.text.clone(),
                    at: Utc::now(),
                },
            ],
        )?;

        info!(client_id, source = ?answer.source, intent = ?answer.intent, "Copilot answered");
        Ok(())
    }

    /// `None` when there is no host, the call fails, or the reply is blank.
    async fn call_host(&self, client_id: &str, user_prompt: &str) -> Option<String> {
        let host = self.host.as_ref()?;
        match host.complete(prompt::system_prompt(), user_prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!(client_id, "Host returned an empty reply, falling back");
                None
            }
            Err(e) => {
                warn!(client_id, error = %e, "Host call failed, falling back");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
