use dotenvy::dotenv;
use std::env;

/// Sampling temperature for every model call.
pub const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub bind_addr: String,
    pub page_title: Option<String>,
    pub page_subheading: Option<String>,
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        dotenv().ok();
        Self {
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            temperature: TEMPERATURE,
            bind_addr: env::var("PARLEY_BIND").unwrap_or_else(|_| "127.0.0.1:8501".to_string()),
            page_title: non_empty_var("PARLEY_TITLE"),
            page_subheading: non_empty_var("PARLEY_SUBHEADING"),
            system_prompt: non_empty_var("PARLEY_SYSTEM_PROMPT"),
        }
    }

    pub fn for_endpoint(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            ollama_base_url: base_url.into(),
            ollama_model: model.into(),
            temperature: TEMPERATURE,
            bind_addr: "127.0.0.1:0".to_string(),
            page_title: None,
            page_subheading: None,
            system_prompt: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
