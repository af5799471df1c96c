// file: src/models/log_hit.rs
// description: log entries returned by a search and their plain-text rendering
// reference: Used as retrieval context for the summarizer

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_LOGS_FOUND: &str = "No logs found.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogHit {
    pub timestamp: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl LogHit {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            index: None,
            level: None,
        }
    }

    /// Builds a hit from one element of `hits.hits` in a search response.
    pub fn from_search_hit(hit: &Value) -> Self {
        let source = hit.get("_source").unwrap_or(&Value::Null);

        let timestamp = source
            .get("@timestamp")
            .and_then(Value::as_str)
            .unwrap_or("No timestamp")
            .to_string();
        let message = source
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("No message")
            .to_string();
        let level = source
            .get("log")
            .and_then(|log| log.get("level"))
            .or_else(|| source.get("level"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let index = hit.get("_index").and_then(Value::as_str).map(str::to_string);

        Self {
            timestamp,
            message,
            index,
            level,
        }
    }

    pub fn line(&self) -> String {
        format!("{}: {}", self.timestamp, self.message)
    }
}

/// Parses a full `_search` response body into hits.
pub fn hits_from_search_response(body: &Value) -> Vec<LogHit> {
    body.get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(LogHit::from_search_hit).collect())
        .unwrap_or_default()
}

/// One line per hit, or the fixed "no logs" sentence when empty.
pub fn render_hits(hits: &[LogHit]) -> String {
    if hits.is_empty() {
        return NO_LOGS_FOUND.to_string();
    }
    hits.iter().map(LogHit::line).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_search_hit_with_missing_fields() {
        let hit = LogHit::from_search_hit(&json!({ "_index": "logs-1", "_source": {} }));
        assert_eq!(hit.timestamp, "No timestamp");
        assert_eq!(hit.message, "No message");
        assert_eq!(hit.index.as_deref(), Some("logs-1"));
    }

    #[test]
    fn test_level_from_ecs_or_flat_field() {
        let ecs = LogHit::from_search_hit(&json!({
            "_source": { "message": "x", "log": { "level": "error" } }
        }));
        assert_eq!(ecs.level.as_deref(), Some("error"));

        let flat = LogHit::from_search_hit(&json!({
            "_source": { "message": "x", "level": "warn" }
        }));
        assert_eq!(flat.level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_render_hits() {
        let body = json!({
            "hits": {
                "hits": [
                    { "_source": { "@timestamp": "2025-06-01T10:00:00Z", "message": "db timeout" } },
                    { "_source": { "@timestamp": "2025-06-01T10:00:05Z", "message": "retrying" } }
                ]
            }
        });

        let hits = hits_from_search_response(&body);
        assert_eq!(
            render_hits(&hits),
            "2025-06-01T10:00:00Z: db timeout\n2025-06-01T10:00:05Z: retrying"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_hits(&[]), NO_LOGS_FOUND);
        assert!(hits_from_search_response(&json!({})).is_empty());
    }
}
