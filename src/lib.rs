pub mod chat;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod preferences;
pub mod prompt;
pub mod search;
pub mod vector_store;
