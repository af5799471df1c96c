// file: src/pipeline/summarizer.rs
// description: asks the chat model for a root-cause summary of the retrieved log lines
// reference: retrieval-augmented answer generation

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::{LogHit, SearchLogsInput};
use crate::utils::Validator;
use std::sync::Arc;

pub const NO_LOGS_ANSWER: &str =
    "No logs found. Try widening the time range or describing the failure differently.";
const MAX_MESSAGE_CHARS: usize = 500;

const SUMMARIZER_PROMPT: &str = "You are a site reliability engineer performing root-cause \
analysis. Using only the log lines provided, answer the user's question: state the most likely \
root cause, cite the timestamps that support it, and say plainly when the logs are not enough \
to decide. Keep the answer short.";

pub struct Summarizer {
    model: Arc<dyn ChatModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Summarizes the hits. With no hits the model is not consulted.
    pub async fn summarize(
        &self,
        question: &str,
        search: &SearchLogsInput,
        hits: &[LogHit],
    ) -> Result<String> {
        if hits.is_empty() {
            return Ok(NO_LOGS_ANSWER.to_string());
        }

        let messages = [
            ChatMessage::system(SUMMARIZER_PROMPT),
            ChatMessage::user(build_context(question, search, hits)),
        ];

        self.model.complete(&messages).await
    }
}

pub fn build_context(question: &str, search: &SearchLogsInput, hits: &[LogHit]) -> String {
    let lines = hits
        .iter()
        .map(|hit| {
            let level = hit
                .level
                .as_deref()
                .map(|l| format!("[{}] ", l.to_uppercase()))
                .unwrap_or_default();
            format!(
                "{}: {}{}",
                hit.timestamp,
                level,
                Validator::truncate_text(&hit.message, MAX_MESSAGE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Question: {}\n\nSearch: {}\n\nLogs ({} entries):\n{}",
        question,
        search.describe(),
        hits.len(),
        lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedModel;

    #[tokio::test]
    async fn test_no_hits_skips_model() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let summarizer = Summarizer::new(model.clone());

        let answer = summarizer
            .summarize("why?", &SearchLogsInput::new("x"), &[])
            .await
            .unwrap();

        assert_eq!(answer, NO_LOGS_ANSWER);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_summary_uses_model_reply() {
        let model = Arc::new(ScriptedModel::new(vec!["The database pool was exhausted."]));
        let summarizer = Summarizer::new(model.clone());
        let hits = vec![LogHit::new("2025-06-01T10:00:00Z", "pool exhausted")];

        let answer = summarizer
            .summarize("why did checkout fail?", &SearchLogsInput::new("checkout"), &hits)
            .await
            .unwrap();

        assert_eq!(answer, "The database pool was exhausted.");
        let calls = model.calls();
        assert!(calls[0][1].content.contains("2025-06-01T10:00:00Z: pool exhausted"));
    }

    #[test]
    fn test_build_context_truncates_and_tags_level() {
        let mut hit = LogHit::new("t", "y".repeat(600));
        hit.level = Some("error".to_string());

        let context = build_context("q", &SearchLogsInput::new("y"), &[hit]);
        assert!(context.contains("t: [ERROR] "));
        assert!(context.contains("..."));
        assert!(context.contains("Logs (1 entries)"));
    }
}
