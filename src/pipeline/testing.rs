// file: src/pipeline/testing.rs
// description: in-memory model and log source doubles shared by unit tests
// reference: test support

use crate::error::{AgentError, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::models::{LogHit, SearchLogsInput};
use crate::source::LogSource;
use crate::utils::HealthCheck;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replies with queued answers in order and records every conversation it receives.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Model("no scripted reply left".to_string()))
    }

    async fn health(&self) -> HealthCheck {
        HealthCheck::healthy("model", Duration::ZERO)
    }
}

pub struct FakeSource {
    hits: Vec<LogHit>,
    failure: Option<String>,
    queries: Mutex<Vec<SearchLogsInput>>,
}

impl FakeSource {
    pub fn with_hits(hits: Vec<LogHit>) -> Self {
        Self {
            hits,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            hits: Vec::new(),
            failure: Some(message.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<SearchLogsInput> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>> {
        self.queries.lock().unwrap().push(input.clone());
        match &self.failure {
            Some(message) => Err(AgentError::Elasticsearch(message.clone())),
            None => Ok(self.hits.clone()),
        }
    }

    async fn health(&self) -> HealthCheck {
        match &self.failure {
            Some(message) => HealthCheck::unhealthy("fake", message.clone(), Duration::ZERO),
            None => HealthCheck::healthy("fake", Duration::ZERO),
        }
    }
}
