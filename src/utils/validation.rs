// file: src/utils/validation.rs
// description: input validation utilities and helpers
// reference: input validation patterns

use crate::error::{AgentError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

const MAX_QUESTION_CHARS: usize = 4000;

pub struct Validator;

impl Validator {
    /// Returns the trimmed question, rejecting blank or oversized input.
    pub fn validate_question(question: &str) -> Result<&str> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return Err(AgentError::Validation(
                "Missing 'question' in body".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_QUESTION_CHARS {
            return Err(AgentError::Validation(format!(
                "Question too long (max {} characters)",
                MAX_QUESTION_CHARS
            )));
        }

        Ok(trimmed)
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AgentError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    pub fn validate_port(port: u16) -> Result<()> {
        if port == 0 {
            return Err(AgentError::Validation("Port cannot be 0".to_string()));
        }
        Ok(())
    }

    /// Kubernetes object names: lowercase alphanumerics and '-', at most 63 chars.
    pub fn validate_resource_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name.len() <= 63
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !name.starts_with('-')
            && !name.ends_with('-');

        if !valid {
            return Err(AgentError::Validation(format!(
                "Invalid resource name: {}",
                name
            )));
        }
        Ok(())
    }

    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
    pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Like `parse_timestamp`, but a plain date means the last millisecond of
    /// that day so an inclusive upper bound covers the whole day.
    pub fn parse_range_end(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
            return Some(day.and_time(end_of_day).and_utc());
        }
        Self::parse_timestamp(value)
    }

    /// RFC 3339 in UTC with a `Z` suffix; fractional seconds only when present.
    pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            None => text.to_string(),
            Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        }
    }
}
