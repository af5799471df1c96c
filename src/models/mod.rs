// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod log_hit;
pub mod query;

pub use log_hit::{LogHit, NO_LOGS_FOUND, hits_from_search_response, render_hits};
pub use query::{ErrorBody, QueryRequest, QueryResponse, SearchLogsInput};
