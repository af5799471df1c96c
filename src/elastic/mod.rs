// file: src/elastic/mod.rs
// description: Elasticsearch REST access module exports
// reference: internal module structure

pub mod client;

pub use client::{ClusterHealth, ElasticsearchClient, IndexInfo};
