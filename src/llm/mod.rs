// file: src/llm/mod.rs
// description: hosted chat model access module exports
// reference: internal module structure

pub mod client;

pub use client::{ChatMessage, ChatModel, ChatRole, OpenAiChatClient};
