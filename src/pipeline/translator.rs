// file: src/pipeline/translator.rs
// description: turns a natural-language question into a structured log search using the chat model
// reference: prompt-to-json extraction for tool arguments

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};
use crate::models::SearchLogsInput;
use crate::utils::Validator;
use chrono::{SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap();
}

const TRANSLATOR_PROMPT: &str = "You translate questions about application logs into an \
Elasticsearch search. Reply with a single JSON object and nothing else, using exactly these keys:\n\
- \"query\": the words to full-text match against the log message (error names, services, status codes)\n\
- \"start_date\": ISO 8601 timestamp for the start of the time window, or null\n\
- \"end_date\": ISO 8601 timestamp for the end of the time window, or null\n\
Only set dates when the question mentions a time window. Resolve relative times against the current time.";

#[derive(Debug, Deserialize)]
struct RawTranslation {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

pub struct QueryTranslator {
    model: Arc<dyn ChatModel>,
}

impl QueryTranslator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn translate(&self, question: &str) -> Result<SearchLogsInput> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let messages = [
            ChatMessage::system(format!("{}\nCurrent time: {}", TRANSLATOR_PROMPT, now)),
            ChatMessage::user(question),
        ];

        let reply = self.model.complete(&messages).await?;
        debug!("Translator reply: {}", reply);

        Ok(parse_translation(&reply, question))
    }
}

/// Reads the model's reply into a search. Unusable replies fall back to
/// matching the question text itself; dates survive only as a valid pair.
pub fn parse_translation(reply: &str, question: &str) -> SearchLogsInput {
    let raw = extract_json_object(reply)
        .and_then(|json| serde_json::from_str::<RawTranslation>(json).ok());

    let Some(raw) = raw else {
        warn!("Could not parse translator output, searching for the question text");
        return SearchLogsInput::new(question.trim());
    };

    let query = raw
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| question.trim().to_string());

    let mut input = SearchLogsInput::new(query);

    let start = raw.start_date.as_deref().and_then(Validator::parse_timestamp);
    let end = raw.end_date.as_deref().and_then(Validator::parse_range_end);

    match (start, end) {
        (Some(start), Some(end)) if start <= end => {
            input = input.with_range(
                Validator::format_timestamp(&start),
                Validator::format_timestamp(&end),
            );
        }
        (Some(_), Some(_)) => warn!("Ignoring inverted time range from translator"),
        _ => {}
    }

    input
}

/// Returns the first balanced `{...}` object in `text`, looking inside a code
/// fence first when one is present.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let scope = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let start = scope.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in scope[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&scope[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedModel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(
            extract_json_object(r#"Sure! {"query": "timeout"} hope that helps"#),
            Some(r#"{"query": "timeout"}"#)
        );
    }

    #[test]
    fn test_extract_from_code_fence() {
        let reply = "Here you go:\n```json\n{\"query\": \"a}b\", \"nested\": {\"x\": 1}}\n```\nDone {}";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"query\": \"a}b\", \"nested\": {\"x\": 1}}")
        );
    }

    #[test]
    fn test_extract_none_when_unbalanced() {
        assert_eq!(extract_json_object("{\"query\": \"x\""), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_translation_with_dates() {
        let reply = r#"{"query": "502 bad gateway", "start_date": "2025-06-01", "end_date": "2025-06-02T12:00:00+02:00"}"#;
        let input = parse_translation(reply, "why 502s yesterday?");
        assert_eq!(input.query, "502 bad gateway");
        assert_eq!(input.start_date.as_deref(), Some("2025-06-01T00:00:00Z"));
        assert_eq!(input.end_date.as_deref(), Some("2025-06-02T10:00:00Z"));
    }

    #[test]
    fn test_parse_translation_single_day_spans_the_day() {
        let reply = r#"{"query": "error", "start_date": "2025-06-01", "end_date": "2025-06-01"}"#;
        let input = parse_translation(reply, "errors on June 1?");
        assert_eq!(input.start_date.as_deref(), Some("2025-06-01T00:00:00Z"));
        assert_eq!(input.end_date.as_deref(), Some("2025-06-01T23:59:59.999Z"));
        assert_ne!(input.start_date, input.end_date);
    }

    #[test]
    fn test_parse_translation_drops_inverted_or_partial_range() {
        let inverted = parse_translation(
            r#"{"query": "x", "start_date": "2025-06-02", "end_date": "2025-06-01"}"#,
            "q",
        );
        assert_eq!(inverted.start_date, None);
        assert_eq!(inverted.end_date, None);

        let partial = parse_translation(r#"{"query": "x", "start_date": "2025-06-02", "end_date": null}"#, "q");
        assert_eq!(partial.start_date, None);
    }

    #[test]
    fn test_parse_translation_falls_back_to_question() {
        let input = parse_translation("I cannot help with that.", "  why is checkout slow?  ");
        assert_eq!(input, SearchLogsInput::new("why is checkout slow?"));

        let empty_query = parse_translation(r#"{"query": "  "}"#, "disk errors");
        assert_eq!(empty_query.query, "disk errors");
    }

    #[tokio::test]
    async fn test_translate_sends_question_and_time() {
        let model = Arc::new(ScriptedModel::new(vec![r#"{"query": "OOMKilled"}"#]));
        let translator = QueryTranslator::new(model.clone());

        let input = translator.translate("why was the pod killed?").await.unwrap();
        assert_eq!(input.query, "OOMKilled");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0][0].content.contains("Current time:"));
        assert_eq!(calls[0][1].content, "why was the pod killed?");
    }
}
