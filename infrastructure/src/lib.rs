pub mod config;
pub mod ndjson;
pub mod ollama_client;
