//! Anthropic Claude host.
//!
//! Implements `LlmHost` over the Anthropic Messages API. Rate-limit and
//! server errors are retried with exponential backoff; client errors fail
//! immediately so the copilot can fall back without waiting.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{HostUsage, LlmHost};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const FALLBACK_MODEL: &str = "claude-sonnet-4-20250514";
const FALLBACK_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Attempts after the first one.
const RETRY_LIMIT: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Turn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ReplyBlock>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl MessagesReply {
    fn text(&self) -> String {
        self.content.iter().filter_map(|b| b.text.as_deref()).collect()
    }

    fn tokens(&self) -> u64 {
        self.usage.as_ref().map_or(0, |u| u.input_tokens + u.output_tokens)
    }
}

/// What a single HTTP attempt produced.
enum Attempt {
    Done(MessagesReply),
    Retry(String),
    Fatal(anyhow::Error),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `retry` (1-based): base, 2×base, 4×base, ...
fn backoff_delay(retry: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(retry.saturating_sub(1))
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub struct AnthropicHost {
    http: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    calls: AtomicU64,
    tokens: AtomicU64,
}

impl AnthropicHost {
    pub fn new(api_key: String, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for the copilot host")?;

        Ok(Self {
            http,
            api_key: SecretString::new(api_key),
            model: model.unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            calls: AtomicU64::new(0),
            tokens: AtomicU64::new(0),
        })
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Attempt {
        let response = match self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(format!("request error: {e}")),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessagesReply>().await {
                Ok(reply) => Attempt::Done(reply),
                Err(e) => Attempt::Fatal(anyhow!(e).context("Malformed Messages API reply")),
            };
        }

        let body = response.text().await.unwrap_or_default();
        if is_retryable(status) {
            Attempt::Retry(format!("HTTP {status}: {body}"))
        } else {
            Attempt::Fatal(anyhow!("Messages API rejected the request with {status}: {body}"))
        }
    }
}

#[async_trait]
impl LlmHost for AnthropicHost {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: Some(system),
            messages: [Turn { role: "user", content: prompt }],
        };

        let mut last_failure = String::new();
        for retry in 0..=RETRY_LIMIT {
            if retry > 0 {
                let delay = backoff_delay(retry);
                debug!(retry, delay_ms = delay.as_millis() as u64, "Backing off before retrying host");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&request).await {
                Attempt::Done(reply) => {
                    let tokens = reply.tokens();
                    self.calls.fetch_add(1, Ordering::Relaxed);
                    self.tokens.fetch_add(tokens, Ordering::Relaxed);
                    debug!(model = %self.model, tokens, "Host completion received");
                    return Ok(reply.text());
                }
                Attempt::Retry(reason) => {
                    warn!(retry, reason = %reason, "Host call failed, will retry");
                    last_failure = reason;
                }
                Attempt::Fatal(e) => return Err(e),
            }
        }

        Err(anyhow!("Host still failing after {RETRY_LIMIT} retries: {last_failure}"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn usage(&self) -> Option<HostUsage> {
        Some(HostUsage {
            calls: self.calls.load(Ordering::Relaxed),
            tokens: self.tokens.load(Ordering::Relaxed),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
