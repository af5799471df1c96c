// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
pub mod summarizer;
pub mod translator;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{Answer, QueryPipeline};
pub use summarizer::{NO_LOGS_ANSWER, Summarizer};
pub use translator::{QueryTranslator, extract_json_object, parse_translation};
