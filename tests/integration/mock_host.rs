//! Mock copilot host for integration testing.
//!
//! Returns scripted replies in order and records every prompt it was
//! sent. All state is in-memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use wealthdesk::copilot::LlmHost;

/// A scripted `LlmHost`. Clones share state, so a test can keep a handle
/// after boxing one into a `Copilot`.
#[derive(Clone, Default)]
pub struct MockHost {
    replies: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    /// If set, every call fails with this message.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: &[&str]) -> Self {
        let host = Self::new();
        host.replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        host
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmHost for MockHost {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        "mock-host"
    }
}
