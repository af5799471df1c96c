// file: src/models/query.rs
// description: HTTP payloads and the structured log search derived from a question
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/query-dsl-bool-query.html

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Body of `POST /query`. The question is optional so a missing field can be
/// reported with the service's own error message instead of a serde rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Structured search the question is translated into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchLogsInput {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SearchLogsInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(mut self, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self.end_date = Some(end_date.into());
        self
    }

    /// Elasticsearch query body: full-text match on `message`, narrowed to a
    /// `@timestamp` range only when both bounds are present. Sorting tolerates
    /// indices without a `@timestamp` mapping.
    pub fn to_query_dsl(&self, size: usize) -> Value {
        let mut must = vec![json!({ "match": { "message": self.query } })];

        if let (Some(start), Some(end)) = (&self.start_date, &self.end_date) {
            must.push(json!({
                "range": {
                    "@timestamp": {
                        "gte": start,
                        "lte": end
                    }
                }
            }));
        }

        json!({
            "query": {
                "bool": {
                    "must": must
                }
            },
            "size": size,
            "sort": [
                { "@timestamp": { "order": "desc", "unmapped_type": "date" } }
            ]
        })
    }

    pub fn describe(&self) -> String {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => format!("\"{}\" between {} and {}", self.query, start, end),
            _ => format!("\"{}\"", self.query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dsl_without_range() {
        let dsl = SearchLogsInput::new("connection refused").to_query_dsl(5);
        assert_eq!(
            dsl,
            json!({
                "query": { "bool": { "must": [ { "match": { "message": "connection refused" } } ] } },
                "size": 5,
                "sort": [ { "@timestamp": { "order": "desc", "unmapped_type": "date" } } ]
            })
        );
    }

    #[test]
    fn test_dsl_with_range() {
        let dsl = SearchLogsInput::new("timeout")
            .with_range("2025-06-01T00:00:00Z", "2025-06-02T00:00:00Z")
            .to_query_dsl(10);

        let must = dsl["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[1]["range"]["@timestamp"]["gte"], "2025-06-01T00:00:00Z");
        assert_eq!(must[1]["range"]["@timestamp"]["lte"], "2025-06-02T00:00:00Z");
        assert_eq!(dsl["size"], 10);
    }

    #[test]
    fn test_dsl_ignores_half_open_range() {
        let mut input = SearchLogsInput::new("oom");
        input.start_date = Some("2025-06-01".to_string());
        let dsl = input.to_query_dsl(5);
        assert_eq!(dsl["query"]["bool"]["must"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_query_request_tolerates_missing_question() {
        let req: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.question.is_none());

        let req: QueryRequest = serde_json::from_str(r#"{"question":"why?"}"#).unwrap();
        assert_eq!(req.question.as_deref(), Some("why?"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(SearchLogsInput::new("disk full").describe(), "\"disk full\"");
        assert_eq!(
            SearchLogsInput::new("disk full")
                .with_range("2025-01-01", "2025-01-02")
                .describe(),
            "\"disk full\" between 2025-01-01 and 2025-01-02"
        );
    }
}
